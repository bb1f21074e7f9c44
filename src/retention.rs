//! Empirical retention over a trailing window of due reviews.

use tracing::debug;

use crate::{
    clock::{DayClock, SECONDS_PER_DAY},
    error::{Error, Result},
    id::DeckId,
    review::ReviewEvent,
};

/// How far back to look when estimating retention.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lookback {
    Days(i64),
    AllHistory,
}

impl Lookback {
    /// Earliest counted timestamp in milliseconds, or `None` for no bound.
    pub fn since(self, day_cutoff: i64) -> Result<Option<i64>> {
        match self {
            Lookback::AllHistory => Ok(None),
            Lookback::Days(days) if days <= 0 => Err(Error::InvalidWindow { days }),
            Lookback::Days(days) => {
                let secs = days
                    .checked_mul(SECONDS_PER_DAY)
                    .map(|span| day_cutoff.saturating_sub(span))
                    .unwrap_or(i64::MIN / 1000);
                Ok(Some(secs.saturating_mul(1000)))
            }
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub failed: u64,
    pub passed: u64,
}

impl OutcomeCounts {
    /// Counts due reviews at or after `since`.
    pub fn tally<'a>(events: impl IntoIterator<Item = &'a ReviewEvent>, since: Option<i64>) -> Self {
        events
            .into_iter()
            .filter(|e| e.counts_toward_retention())
            .filter(|e| since.is_none_or(|since| e.at >= since))
            .fold(Self::default(), |mut acc, e| {
                if e.grade.passed() {
                    acc.passed += 1;
                } else {
                    acc.failed += 1;
                }
                acc
            })
    }
}

/// Read access to the review history.
pub trait ReviewLog {
    fn has_scope(&self, scope: &DeckId) -> bool;

    /// Pass and fail counts of due reviews of cards in `scope`, at or after
    /// `since` milliseconds.
    fn query_outcome_counts(&self, scope: &DeckId, since: Option<i64>) -> Result<OutcomeCounts>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RetentionSample {
    pub passed: u64,
    pub failed: u64,
    pub retention_percent: f64,
}

impl RetentionSample {
    /// With no reviews in the window, retention counts as perfect.
    pub fn from_counts(counts: OutcomeCounts) -> Self {
        let OutcomeCounts { failed, passed } = counts;
        let total = passed + failed;
        let retention_percent = if total == 0 {
            100.0
        } else {
            passed as f64 / total as f64 * 100.0
        };
        Self {
            passed,
            failed,
            retention_percent,
        }
    }

    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }

    /// Retention for display, rounded to two decimals.
    pub fn display_percent(&self) -> f64 {
        crate::round2(self.retention_percent)
    }
}

pub fn estimate_retention(
    log: &impl ReviewLog,
    clock: &impl DayClock,
    scope: &DeckId,
    window: Lookback,
) -> Result<RetentionSample> {
    let since = window.since(clock.current_day_cutoff())?;
    if !log.has_scope(scope) {
        return Err(Error::InvalidScope(*scope));
    }
    let counts = log.query_outcome_counts(scope, since)?;
    debug!(%scope, ?window, ?since, ?counts, "estimated retention");
    Ok(RetentionSample::from_counts(counts))
}
