//! Meal Counter / Termination Detector.
//!
//! Workers report their committed meal count after every completed meal.
//! The report that first lifts a philosopher to the target bumps a shared
//! satisfied count; the bump that reaches N trips `AllSatisfied`.

use crate::termination::{TerminalReason, Termination};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts philosophers that have reached the meal target.
#[derive(Debug)]
pub struct MealCounter {
    /// `None` when the run has no target; the counter then never fires.
    target: Option<u32>,

    /// Philosophers at the table.
    total: usize,

    /// Philosophers whose committed count reached the target.
    satisfied: AtomicUsize,
}

impl MealCounter {
    pub fn new(target: Option<u32>, total: usize) -> Self {
        Self {
            target,
            total,
            satisfied: AtomicUsize::new(0),
        }
    }

    /// True if `meals` meets the target.
    pub fn is_satisfied(&self, meals: u32) -> bool {
        self.target.is_some_and(|t| meals >= t)
    }

    /// Records a committed meal count for one philosopher.
    ///
    /// Must be called once per completed meal with the count returned by
    /// the seat, so that exactly one report per philosopher equals the
    /// target. Returns true if this report tripped `AllSatisfied`.
    pub fn record(&self, meals: u32, termination: &Termination) -> bool {
        match self.target {
            Some(target) if meals == target => {}
            _ => return false,
        }
        let reached = self.satisfied.fetch_add(1, Ordering::AcqRel) + 1;
        reached == self.total && termination.trip(TerminalReason::AllSatisfied)
    }

    /// Philosophers that reached the target so far.
    pub fn satisfied(&self) -> usize {
        self.satisfied.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_target_never_fires() {
        let latch = Termination::new();
        let counter = MealCounter::new(None, 2);
        for meals in 1..100 {
            assert!(!counter.record(meals, &latch));
        }
        assert!(!latch.is_tripped());
        assert!(!counter.is_satisfied(1_000));
    }

    #[test]
    fn test_fires_once_when_last_philosopher_reaches_target() {
        let latch = Termination::new();
        let counter = MealCounter::new(Some(2), 3);

        assert!(!counter.record(1, &latch));
        assert!(!counter.record(2, &latch));
        assert!(!counter.record(1, &latch));
        assert!(!counter.record(2, &latch));
        assert_eq!(counter.satisfied(), 2);
        assert!(!latch.is_tripped());

        assert!(counter.record(2, &latch));
        assert_eq!(latch.reason(), Some(&TerminalReason::AllSatisfied));
    }

    #[test]
    fn test_counts_beyond_target_are_ignored() {
        let latch = Termination::new();
        let counter = MealCounter::new(Some(1), 2);
        assert!(!counter.record(1, &latch));
        assert!(!counter.record(2, &latch));
        assert!(!counter.record(3, &latch));
        assert_eq!(counter.satisfied(), 1);
    }

    #[test]
    fn test_loses_to_earlier_terminal_event() {
        let latch = Termination::new();
        latch.trip(TerminalReason::Stopped);
        let counter = MealCounter::new(Some(1), 1);
        assert!(!counter.record(1, &latch));
        assert_eq!(latch.reason(), Some(&TerminalReason::Stopped));
    }
}
