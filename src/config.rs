//! User settings.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{modifier::TargetRetention, retention::Lookback};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedWindow {
    pub name: String,
    /// Omitted for a window spanning the whole review history.
    #[serde(default)]
    pub days: Option<i64>,
}

impl NamedWindow {
    pub fn lookback(&self) -> Lookback {
        self.days.map_or(Lookback::AllHistory, Lookback::Days)
    }
}

fn default_windows() -> Vec<NamedWindow> {
    vec![
        NamedWindow {
            name: "Month".into(),
            days: Some(31),
        },
        NamedWindow {
            name: "Year".into(),
            days: Some(365),
        },
        NamedWindow {
            name: "All Time".into(),
            days: None,
        },
    ]
}

fn default_rollover_hour() -> u32 {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub default_target: TargetRetention,
    /// Local hour at which the scheduling day starts.
    #[serde(default = "default_rollover_hour")]
    pub rollover_hour: u32,
    #[serde(default = "default_windows")]
    pub windows: Vec<NamedWindow>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_target: TargetRetention::default(),
            rollover_hour: default_rollover_hour(),
            windows: default_windows(),
        }
    }
}

impl Settings {
    pub fn window(&self, name: &str) -> Option<&NamedWindow> {
        self.windows
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.rollover_hour < 24,
            "rollover_hour must be below 24, got {}",
            self.rollover_hour
        );
        anyhow::ensure!(!self.windows.is_empty(), "at least one window is required");
        for window in &self.windows {
            if let Some(days) = window.days {
                anyhow::ensure!(days > 0, "window `{}` must span at least one day", window.name);
            }
        }
        Ok(())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let settings: Self = match File::open(path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    let mut dir = match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let mut home = PathBuf::from(std::env::var("HOME")?);
            home.push(".config");
            home
        }
    };
    dir.push("ivltune/config.json");
    Ok(dir)
}
