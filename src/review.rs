//! Review log entries.

use serde::{Deserialize, Serialize};

use crate::id::ItemId;

/// Answer given when a card was shown. `Again` is the only failing grade.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Grade {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Grade {
    pub fn passed(self) -> bool {
        !matches!(self, Grade::Again)
    }
}

impl TryFrom<u8> for Grade {
    type Error = String;

    fn try_from(ease: u8) -> Result<Self, Self::Error> {
        match ease {
            1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            _ => Err(format!("grade must be 1-4, got {ease}")),
        }
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade as u8
    }
}

/// Which scheduling phase produced a review.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReviewKind {
    Learn,
    /// A graduated card shown because it fell due.
    Review,
    Relearn,
    /// Reviewed ahead of schedule inside a filtered deck.
    Filtered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub item: ItemId,
    /// Milliseconds since the Unix epoch.
    pub at: i64,
    pub grade: Grade,
    pub kind: ReviewKind,
}

impl ReviewEvent {
    /// Only due reviews say anything about long-term recall.
    pub fn counts_toward_retention(&self) -> bool {
        self.kind == ReviewKind::Review
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;

    #[test]
    fn only_again_fails() {
        assert!(!Grade::Again.passed());
        assert!(Grade::Hard.passed());
        assert!(Grade::Good.passed());
        assert!(Grade::Easy.passed());
    }

    #[test]
    fn grade_from_ease() {
        assert_eq!(Grade::try_from(3), Ok(Grade::Good));
        assert!(Grade::try_from(0).is_err());
        assert!(Grade::try_from(5).is_err());
    }

    #[test]
    fn event_json_shape() {
        let event = ReviewEvent {
            item: Id::new(0),
            at: 1_700_000_000_000,
            grade: Grade::Hard,
            kind: ReviewKind::Relearn,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "item": "AAAAAAAAAAA",
                "at": 1_700_000_000_000i64,
                "grade": 2,
                "kind": "relearn",
            })
        );
        assert!(!event.counts_toward_retention());
    }
}
