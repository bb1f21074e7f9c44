//! Interval modifier recommendation.
//!
//! Intervals grow exponentially with the modifier, so the ratio of the log
//! retention fractions estimates the multiplicative correction that moves
//! measured retention onto the target:
//!
//! ```text
//! new = current_modifier * log10(target / 100) / log10(retention / 100)
//! ```
//!
//! The ratio is undefined at 0% and 100% retention. 100% is reported as
//! [`Recommendation::Degenerate`], 0% as [`Error::DegenerateInput`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    round2,
};

pub const DEFAULT_TARGET_RETENTION: u8 = 85;

/// Desired retention, a whole percentage in `1..=100`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct TargetRetention(u8);

impl TargetRetention {
    pub fn new(percent: i64) -> Result<Self> {
        match u8::try_from(percent) {
            Ok(p @ 1..=100) => Ok(Self(p)),
            _ => Err(Error::InvalidTarget(percent)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Moves by `delta` points, staying within range.
    pub fn nudge(self, delta: i64) -> Self {
        Self((i64::from(self.0) + delta).clamp(1, 100) as u8)
    }
}

impl Default for TargetRetention {
    fn default() -> Self {
        Self(DEFAULT_TARGET_RETENTION)
    }
}

impl TryFrom<i64> for TargetRetention {
    type Error = Error;

    fn try_from(percent: i64) -> Result<Self> {
        Self::new(percent)
    }
}

impl From<TargetRetention> for u8 {
    fn from(target: TargetRetention) -> Self {
        target.0
    }
}

impl fmt::Display for TargetRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Recommendation {
    /// New modifier, rounded to two decimals.
    Computed(f64),
    /// Retention was perfect; the modifier has to be chosen by hand.
    Degenerate,
}

impl Recommendation {
    /// Placeholder shown in place of a value when no recommendation exists.
    pub const SENTINEL: f64 = 1.0;

    /// The value that may be written back, if any.
    pub fn applicable(self) -> Option<f64> {
        match self {
            Recommendation::Computed(v) => Some(v),
            Recommendation::Degenerate => None,
        }
    }

    pub fn display_value(self) -> f64 {
        self.applicable().unwrap_or(Self::SENTINEL)
    }
}

pub fn recommend_modifier(
    current_retention: f64,
    current_modifier: f64,
    target: TargetRetention,
) -> Result<Recommendation> {
    if !(0.0..=100.0).contains(&current_retention) {
        return Err(Error::InvalidRetention(current_retention));
    }
    if !current_modifier.is_finite() || current_modifier <= 0.0 {
        return Err(Error::InvalidModifier(current_modifier));
    }
    if current_retention == 100.0 {
        return Ok(Recommendation::Degenerate);
    }
    if current_retention == 0.0 {
        return Err(Error::DegenerateInput {
            retention: current_retention,
        });
    }

    let log_current = (current_retention / 100.0).log10();
    let log_desired = (f64::from(target.get()) / 100.0).log10();
    let recommended = round2(current_modifier * log_desired / log_current);
    if !recommended.is_finite() {
        return Err(Error::DegenerateInput {
            retention: current_retention,
        });
    }
    Ok(Recommendation::Computed(recommended))
}

/// The inputs of one recommendation alongside its result.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModifierRecommendation {
    pub current_modifier: f64,
    pub target: TargetRetention,
    pub recommended: Recommendation,
}

impl ModifierRecommendation {
    pub fn compute(
        current_retention: f64,
        current_modifier: f64,
        target: TargetRetention,
    ) -> Result<Self> {
        Ok(Self {
            current_modifier,
            target,
            recommended: recommend_modifier(current_retention, current_modifier, target)?,
        })
    }
}
