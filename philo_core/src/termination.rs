//! Termination latch: the first terminal event wins.
//!
//! Every detector (watchdog, meal counter, an external stop, a worker that
//! hit a fork violation) calls [`Termination::trip`]. The reason slot is a
//! `OnceLock`, so exactly one caller succeeds; the winner then fires the
//! broadcast [`CancellationToken`] that every suspended worker is racing.

use crate::error::ForkError;
use philo_env::PhilosopherId;
use std::sync::OnceLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalReason {
    /// Every philosopher reached the meal target.
    AllSatisfied,

    /// A philosopher starved. `at` is measured from simulation start.
    PhilosopherDied { id: PhilosopherId, at: Duration },

    /// Stopped from outside before any other terminal event.
    Stopped,

    /// The fork bookkeeping was violated; the run is invalid.
    Fault(ForkError),
}

impl TerminalReason {
    /// Returns a short stable label for logs and JSON output.
    pub fn as_label(&self) -> &'static str {
        match self {
            TerminalReason::AllSatisfied => "all_satisfied",
            TerminalReason::PhilosopherDied { .. } => "philosopher_died",
            TerminalReason::Stopped => "stopped",
            TerminalReason::Fault(_) => "fault",
        }
    }
}

/// Write-once terminal reason plus the cancellation broadcast.
#[derive(Debug, Default)]
pub struct Termination {
    reason: OnceLock<TerminalReason>,
    cancel: CancellationToken,
}

impl Termination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `reason` if no terminal event happened yet, then cancels.
    ///
    /// Returns `true` for the single winning caller.
    pub fn trip(&self, reason: TerminalReason) -> bool {
        let won = self.reason.set(reason).is_ok();
        if won {
            self.cancel.cancel();
        }
        won
    }

    /// True once any terminal event has been recorded.
    pub fn is_tripped(&self) -> bool {
        self.reason.get().is_some()
    }

    /// The winning reason, if any.
    pub fn reason(&self) -> Option<&TerminalReason> {
        self.reason.get()
    }

    /// The broadcast token observed at every suspension point.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves once the latch has been tripped.
    pub async fn tripped(&self) {
        self.cancel.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_writer_wins() {
        let latch = Termination::new();
        assert!(!latch.is_tripped());
        assert!(!latch.token().is_cancelled());

        assert!(latch.trip(TerminalReason::AllSatisfied));
        assert!(!latch.trip(TerminalReason::Stopped));

        assert_eq!(latch.reason(), Some(&TerminalReason::AllSatisfied));
        assert!(latch.token().is_cancelled());
    }

    #[test]
    fn test_concurrent_trips_have_one_winner() {
        let latch = Arc::new(Termination::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let latch = latch.clone();
                std::thread::spawn(move || {
                    latch.trip(TerminalReason::PhilosopherDied {
                        id: PhilosopherId(i),
                        at: Duration::from_millis(10),
                    })
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_tripped_resolves_after_trip() {
        let latch = Arc::new(Termination::new());
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.tripped().await })
        };
        latch.trip(TerminalReason::Stopped);
        waiter.await.unwrap();
        assert_eq!(latch.reason().map(|r| r.as_label()), Some("stopped"));
    }
}
