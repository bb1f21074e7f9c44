//! Caller-owned state for tuning a single deck.

use crate::{
    clock::DayClock,
    error::Result,
    id::{DeckId, GroupId},
    modifier::{ModifierRecommendation, TargetRetention},
    retention::{Lookback, RetentionSample, ReviewLog, estimate_retention},
};

/// Where interval modifiers are kept, one per options group.
pub trait ConfigStore {
    fn group_of(&self, scope: &DeckId) -> Result<GroupId>;
    fn read_modifier(&self, group: &GroupId) -> Result<f64>;
    /// Only called on explicit confirmation. Failures are returned as-is and
    /// never retried.
    fn write_modifier(&mut self, group: &GroupId, modifier: f64) -> Result<()>;
}

/// The deck being tuned, the chosen window and target, and the last
/// retention measured for them.
///
/// Recommendations are recomputed from scratch on every request.
#[derive(Debug, Clone)]
pub struct TuningSession {
    deck: DeckId,
    group: GroupId,
    window: Lookback,
    target: TargetRetention,
    current_modifier: f64,
    sample: RetentionSample,
}

impl TuningSession {
    pub fn open<S: ReviewLog + ConfigStore>(
        store: &S,
        clock: &impl DayClock,
        deck: DeckId,
        window: Lookback,
        target: TargetRetention,
    ) -> Result<Self> {
        let sample = estimate_retention(store, clock, &deck, window)?;
        let group = store.group_of(&deck)?;
        let current_modifier = store.read_modifier(&group)?;
        Ok(Self {
            deck,
            group,
            window,
            target,
            current_modifier,
            sample,
        })
    }

    pub fn deck(&self) -> DeckId {
        self.deck
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn window(&self) -> Lookback {
        self.window
    }

    pub fn target(&self) -> TargetRetention {
        self.target
    }

    pub fn current_modifier(&self) -> f64 {
        self.current_modifier
    }

    pub fn sample(&self) -> &RetentionSample {
        &self.sample
    }

    pub fn select_window(
        &mut self,
        log: &impl ReviewLog,
        clock: &impl DayClock,
        window: Lookback,
    ) -> Result<()> {
        self.sample = estimate_retention(log, clock, &self.deck, window)?;
        self.window = window;
        Ok(())
    }

    pub fn set_target(&mut self, target: TargetRetention) {
        self.target = target;
    }

    pub fn recommendation(&self) -> Result<ModifierRecommendation> {
        ModifierRecommendation::compute(
            self.sample.retention_percent,
            self.current_modifier,
            self.target,
        )
    }

    /// Writes `modifier` to the deck's options group.
    pub fn apply(&mut self, config: &mut impl ConfigStore, modifier: f64) -> Result<()> {
        config.write_modifier(&self.group, modifier)?;
        self.current_modifier = config.read_modifier(&self.group)?;
        Ok(())
    }

    /// Writes the computed recommendation, if there is one. Returns the
    /// value written.
    pub fn apply_recommended(&mut self, config: &mut impl ConfigStore) -> Result<Option<f64>> {
        let Some(value) = self.recommendation()?.recommended.applicable() else {
            return Ok(None);
        };
        self.apply(config, value)?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Error,
        clock::FixedClock,
        id::Id,
        modifier::Recommendation,
        review::{Grade, ReviewEvent, ReviewKind},
        store::Collection,
    };

    const CUTOFF: i64 = 1_700_000_000;

    fn collection(passed: usize, failed: usize) -> (Collection, DeckId) {
        let mut col = Collection::default();
        let deck = col.add_deck("Spanish", "Default", false);
        let at = (CUTOFF - 86_400) * 1000;
        let grades = std::iter::repeat_n(Grade::Good, passed)
            .chain(std::iter::repeat_n(Grade::Again, failed));
        for (n, grade) in grades.enumerate() {
            col.record(
                deck,
                ReviewEvent {
                    item: Id::new(n as u64),
                    at,
                    grade,
                    kind: ReviewKind::Review,
                },
            )
            .unwrap();
        }
        (col, deck)
    }

    fn target(p: i64) -> TargetRetention {
        TargetRetention::new(p).unwrap()
    }

    #[test]
    fn recommends_from_measured_retention() {
        let (col, deck) = collection(7, 3);
        let session =
            TuningSession::open(&col, &FixedClock(CUTOFF), deck, Lookback::Days(31), target(90))
                .unwrap();
        assert_eq!(session.sample().retention_percent, 70.0);
        assert_eq!(session.current_modifier(), 100.0);
        assert_eq!(
            session.recommendation().unwrap().recommended,
            Recommendation::Computed(29.54)
        );
    }

    #[test]
    fn target_and_window_changes_recompute() {
        let (col, deck) = collection(7, 3);
        let clock = FixedClock(CUTOFF);
        let mut session =
            TuningSession::open(&col, &clock, deck, Lookback::Days(31), target(90)).unwrap();
        session.set_target(target(70));
        assert_eq!(
            session.recommendation().unwrap().recommended,
            Recommendation::Computed(100.0)
        );

        // the reviews are a day old, so a half-day window would be empty
        session.select_window(&col, &clock, Lookback::AllHistory).unwrap();
        assert_eq!(session.sample().total(), 10);
        assert!(matches!(
            session.select_window(&col, &clock, Lookback::Days(0)),
            Err(Error::InvalidWindow { .. })
        ));
        assert_eq!(session.window(), Lookback::AllHistory);
    }

    #[test]
    fn apply_updates_store_and_session() {
        let (mut col, deck) = collection(7, 3);
        let mut session =
            TuningSession::open(&col, &FixedClock(CUTOFF), deck, Lookback::Days(31), target(90))
                .unwrap();
        assert_eq!(session.apply_recommended(&mut col).unwrap(), Some(29.54));
        assert_eq!(session.current_modifier(), 29.54);
        assert_eq!(col.read_modifier(&session.group()).unwrap(), 29.54);
        assert_eq!(
            session.recommendation().unwrap().recommended,
            Recommendation::Computed(8.73)
        );
    }

    #[test]
    fn perfect_retention_is_never_applied() {
        let (mut col, deck) = collection(5, 0);
        let mut session =
            TuningSession::open(&col, &FixedClock(CUTOFF), deck, Lookback::Days(31), target(85))
                .unwrap();
        assert_eq!(
            session.recommendation().unwrap().recommended,
            Recommendation::Degenerate
        );
        assert_eq!(session.apply_recommended(&mut col).unwrap(), None);
        assert_eq!(col.read_modifier(&session.group()).unwrap(), 100.0);

        session.apply(&mut col, 120.0).unwrap();
        assert_eq!(session.current_modifier(), 120.0);
    }

    #[test]
    fn total_recall_failure_needs_manual_entry() {
        let (col, deck) = collection(0, 4);
        let session =
            TuningSession::open(&col, &FixedClock(CUTOFF), deck, Lookback::Days(31), target(85))
                .unwrap();
        assert!(matches!(
            session.recommendation(),
            Err(Error::DegenerateInput { .. })
        ));
    }

    #[test]
    fn unknown_deck() {
        let (col, _) = collection(1, 1);
        assert!(matches!(
            TuningSession::open(
                &col,
                &FixedClock(CUTOFF),
                Id::new(42),
                Lookback::Days(31),
                target(85)
            ),
            Err(Error::InvalidScope(_))
        ));
    }
}
