//! Tunes a deck's interval modifier toward a target retention rate.
//!
//! [`retention::estimate_retention`] measures how often due reviews were
//! passed over a lookback window, and [`modifier::recommend_modifier`] turns
//! that measurement into a new interval modifier. Everything else in the
//! crate supplies or presents their inputs.

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod modifier;
pub mod retention;
pub mod review;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use id::{DeckId, GroupId, Id, ItemId};
pub use modifier::{ModifierRecommendation, Recommendation, TargetRetention, recommend_modifier};
pub use retention::{Lookback, OutcomeCounts, RetentionSample, ReviewLog, estimate_retention};
pub use session::{ConfigStore, TuningSession};

/// Rounds to two decimal places. Only applied to values leaving the crate.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
