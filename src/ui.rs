use std::io::{Stdout, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::{Print, Stylize},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use ivltune::{
    DeckId, Error, ModifierRecommendation, Recommendation, TargetRetention, TuningSession,
    clock::SchedulerClock,
    config::Settings,
    store::Store,
};

const DEGENERATE_HINT: &str =
    "100% retention breaks the equation. Update Interval Modifier manually.";

struct Screen {
    stdout: Stdout,
}

impl Screen {
    fn enter() -> anyhow::Result<Self> {
        let mut stdout = std::io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, Hide)?;
        Ok(Self { stdout })
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        _ = terminal::disable_raw_mode();
    }
}

pub fn recommendation_line(rec: &Result<ModifierRecommendation, Error>) -> String {
    match rec {
        Ok(ModifierRecommendation {
            recommended: Recommendation::Computed(v),
            ..
        }) => format!("{v}"),
        Ok(ModifierRecommendation {
            recommended: Recommendation::Degenerate,
            ..
        }) => format!("{} (set manually)", Recommendation::SENTINEL),
        Err(Error::DegenerateInput { .. }) => {
            "none, no due review was passed. Set manually.".to_string()
        }
        Err(e) => format!("unavailable: {e}"),
    }
}

struct Tuner<'a> {
    store: &'a mut Store,
    clock: SchedulerClock,
    settings: &'a Settings,
    decks: Vec<(DeckId, String)>,
    selected: usize,
    window: usize,
    target: TargetRetention,
    session: Option<TuningSession>,
    status: Option<String>,
    entry: Option<String>,
}

impl Tuner<'_> {
    fn open_selected(&mut self) {
        let Some((deck, _)) = self.decks.get(self.selected) else {
            self.session = None;
            return;
        };
        let window = self.settings.windows[self.window].lookback();
        match TuningSession::open(&*self.store, &self.clock, *deck, window, self.target) {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                self.session = None;
                self.status = Some(e.to_string());
            }
        }
    }

    fn cycle_window(&mut self) {
        self.window = (self.window + 1) % self.settings.windows.len();
        let window = self.settings.windows[self.window].lookback();
        match &mut self.session {
            Some(session) => {
                if let Err(e) = session.select_window(&*self.store, &self.clock, window) {
                    self.status = Some(e.to_string());
                }
            }
            None => self.open_selected(),
        }
    }

    fn nudge_target(&mut self, delta: i64) {
        self.target = self.target.nudge(delta);
        if let Some(session) = &mut self.session {
            session.set_target(self.target);
        }
    }

    fn set_recommended(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        self.status = Some(match session.apply_recommended(&mut *self.store) {
            Ok(Some(v)) => format!("Set interval modifier to {v}"),
            Ok(None) => DEGENERATE_HINT.to_string(),
            Err(e) => e.to_string(),
        });
    }

    fn set_manual(&mut self, text: &str) {
        let Some(session) = &mut self.session else {
            return;
        };
        self.status = Some(match text.trim().parse::<f64>() {
            Ok(v) => match session.apply(&mut *self.store, v) {
                Ok(()) => format!("Set interval modifier to {v}"),
                Err(e) => e.to_string(),
            },
            Err(_) => format!("`{text}` is not a number"),
        });
    }

    fn draw(&self, stdout: &mut Stdout) -> anyhow::Result<()> {
        let (columns, _) = terminal::size()?;
        let header_text = "IVLTUNE";
        execute!(
            stdout,
            MoveTo(0, 0),
            Clear(ClearType::All),
            MoveTo(columns.saturating_sub(header_text.len() as u16) / 2, 0),
            Print(header_text.red()),
            Print("\r\n\n"),
        )?;

        if self.decks.is_empty() {
            execute!(stdout, Print("No decks yet. Add one with `ivltune add-deck`.\r\n"))?;
        }
        for (idx, (_, name)) in self.decks.iter().enumerate() {
            if idx == self.selected {
                execute!(stdout, Print("> ".yellow()), Print(name.as_str().bold()))?;
            } else {
                execute!(stdout, Print(format!("  {name}")))?;
            }
            execute!(stdout, Print("\r\n"))?;
        }
        execute!(stdout, Print("\r\n"))?;

        if let Some(session) = &self.session {
            let group = self
                .store
                .collection()
                .groups
                .get(&session.group())
                .map_or("?", |g| g.name.as_str());
            let sample = session.sample();
            let rec = session.recommendation();
            execute!(
                stdout,
                Print(format!(
                    "Retention period:          {}\r\n",
                    self.settings.windows[self.window].name
                )),
                Print(format!("Options group:             {group}\r\n")),
                Print(format!(
                    "Current interval modifier: {}\r\n",
                    session.current_modifier()
                )),
                Print(format!("Target retention:          {}\r\n", session.target())),
                Print(format!(
                    "Current retention:         {}% ({} passed, {} failed)\r\n",
                    sample.display_percent(),
                    sample.passed,
                    sample.failed
                )),
            )?;
            if matches!(&rec, Ok(r) if r.recommended == Recommendation::Degenerate) {
                execute!(stdout, Print(DEGENERATE_HINT.yellow()), Print("\r\n"))?;
            }
            execute!(
                stdout,
                Print(format!(
                    "New interval modifier:     {}\r\n",
                    recommendation_line(&rec)
                )),
            )?;
        }

        execute!(stdout, Print("\r\n"))?;
        if let Some(entry) = &self.entry {
            execute!(stdout, Print(format!("Modifier: {entry}_\r\n")))?;
        } else if let Some(status) = &self.status {
            execute!(stdout, Print(status.as_str().green()), Print("\r\n"))?;
        }
        execute!(
            stdout,
            Print(
                "\r\nup/down: deck  w: period  +/-: target  s: set  m: enter manually  q: quit"
                    .dark_grey()
            ),
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Returns false once the user quits.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let Some(entry) = &mut self.entry {
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => entry.push(c),
                KeyCode::Backspace => {
                    entry.pop();
                }
                KeyCode::Enter => {
                    let text = std::mem::take(entry);
                    self.entry = None;
                    self.set_manual(&text);
                }
                KeyCode::Esc => self.entry = None,
                _ => {}
            }
            return true;
        }

        self.status = None;
        match key {
            KeyEvent {
                code: KeyCode::Esc | KeyCode::Char('q'),
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => return false,
            KeyEvent {
                code: KeyCode::Up | KeyCode::Char('k'),
                ..
            } if self.selected > 0 => {
                self.selected -= 1;
                self.open_selected();
            }
            KeyEvent {
                code: KeyCode::Down | KeyCode::Char('j'),
                ..
            } if self.selected + 1 < self.decks.len() => {
                self.selected += 1;
                self.open_selected();
            }
            KeyEvent {
                code: KeyCode::Char('w') | KeyCode::Tab,
                ..
            } => self.cycle_window(),
            KeyEvent {
                code: KeyCode::Char('+' | '=') | KeyCode::Right,
                ..
            } => self.nudge_target(1),
            KeyEvent {
                code: KeyCode::Char('-') | KeyCode::Left,
                ..
            } => self.nudge_target(-1),
            KeyEvent {
                code: KeyCode::Char('s') | KeyCode::Enter,
                ..
            } => self.set_recommended(),
            KeyEvent {
                code: KeyCode::Char('m'),
                ..
            } if self.session.is_some() => self.entry = Some(String::new()),
            _ => {}
        }
        true
    }
}

pub fn run(store: &mut Store, clock: SchedulerClock, settings: &Settings) -> anyhow::Result<()> {
    let decks = store
        .collection()
        .tunable_decks()
        .into_iter()
        .map(|(id, deck)| (id, deck.name.clone()))
        .collect();
    let mut tuner = Tuner {
        store,
        clock,
        settings,
        decks,
        selected: 0,
        window: 0,
        target: settings.default_target,
        session: None,
        status: None,
        entry: None,
    };
    tuner.open_selected();

    let mut screen = Screen::enter()?;
    loop {
        tuner.draw(&mut screen.stdout)?;
        match crossterm::event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if !tuner.handle_key(key) {
                    break;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
