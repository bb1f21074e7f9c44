use crate::id::Id;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown deck or options group {0}")]
    InvalidScope(Id),

    #[error("lookback window must be at least one day, got {days}")]
    InvalidWindow { days: i64 },

    #[error("current retention must be within 0..=100, got {0}")]
    InvalidRetention(f64),

    #[error("target retention must be within 1..=100, got {0}")]
    InvalidTarget(i64),

    #[error("interval modifier must be a positive number, got {0}")]
    InvalidModifier(f64),

    #[error("{retention}% retention leaves the interval modifier undefined")]
    DegenerateInput { retention: f64 },

    #[error("failed to save interval modifier")]
    PersistenceFailure(#[source] std::io::Error),

    #[error("failed to load collection")]
    StoreUnavailable(#[source] std::io::Error),
}
