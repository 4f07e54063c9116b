//! Death Watchdog - one timer-driven sweep over every seat.
//!
//! Each tick checks seats in ascending id order and stops at the first
//! starving philosopher, so when several cross the deadline in the same
//! tick the lowest id is the one reported. The tick interval comes from
//! [`DinnerConfig::watchdog_interval`](crate::DinnerConfig::watchdog_interval),
//! which bounds detection latency to a tenth of TimeDie or 5 ms.

use crate::table::Table;
use crate::transcript::Activity;

use philo_env::{DinnerContext, PhilosopherId};
use std::sync::Arc;
use tracing::{debug, info};

/// Liveness monitor for all philosophers of a run.
pub(crate) struct Watchdog<Ctx: DinnerContext> {
    table: Arc<Table<Ctx>>,
}

impl<Ctx: DinnerContext> Watchdog<Ctx> {
    pub(crate) fn new(table: Arc<Table<Ctx>>) -> Self {
        Self { table }
    }

    /// Sweeps until the run ends.
    pub(crate) async fn run(self) {
        let interval = self.table.config.watchdog_interval();
        debug!("watchdog started, sweeping every {:?}", interval);
        while self.table.pause(interval).await.is_ok() {
            if let Some(id) = self.sweep() {
                info!(
                    "philosopher {} died at {}ms",
                    id,
                    self.table.now().as_millis()
                );
                break;
            }
        }
        debug!("watchdog stopped");
    }

    /// One pass over every seat. Returns the philosopher declared dead, if any.
    pub(crate) fn sweep(&self) -> Option<PhilosopherId> {
        let time_die = self.table.config.time_die();
        for seat in &self.table.seats {
            let now = self.table.now();
            if seat.check_starvation(now, time_die, &self.table.termination) {
                self.table.note(seat.id(), Activity::Died);
                return Some(seat.id());
            }
            if self.table.termination.is_tripped() {
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DinnerConfig;
    use crate::seat::PhilosopherState;
    use crate::termination::TerminalReason;
    use philo_env::TokioContext;
    use std::time::Duration;

    fn table(config: DinnerConfig) -> Arc<Table<TokioContext>> {
        Arc::new(Table::new(TokioContext::shared(), config, None))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_reports_lowest_starving_id() {
        let config = DinnerConfig::new(4, 50, 10, 10, 0, 0).unwrap();
        let table = table(config);
        let watchdog = Watchdog::new(table.clone());

        // Philosopher 0 is eating, 1..3 have been waiting since the start.
        let started = table
            .seat(PhilosopherId(0))
            .begin_meal(Duration::ZERO, config.time_die(), &table.termination, || Ok(true));
        assert_eq!(started, Ok(true));
        tokio::time::advance(Duration::from_millis(60)).await;

        assert_eq!(watchdog.sweep(), Some(PhilosopherId(1)));
        assert_eq!(table.seat(PhilosopherId(1)).snapshot().state, PhilosopherState::Dead);
        assert_ne!(table.seat(PhilosopherId(2)).snapshot().state, PhilosopherState::Dead);
        assert!(matches!(
            table.termination.reason(),
            Some(TerminalReason::PhilosopherDied { id: PhilosopherId(1), .. })
        ));

        // Nobody else can die afterwards.
        assert_eq!(watchdog.sweep(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_latency_is_bounded() {
        let config = DinnerConfig::new(2, 100, 10, 10, 0, 0).unwrap();
        let table = table(config);
        tokio::spawn(Watchdog::new(table.clone()).run());

        table.termination.tripped().await;
        let Some(TerminalReason::PhilosopherDied { at, .. }) = table.termination.reason().cloned() else {
            panic!("expected a death, got {:?}", table.termination.reason());
        };
        assert!(at > Duration::from_millis(100));
        assert!(at <= Duration::from_millis(100) + config.watchdog_interval());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_exits_on_external_stop() {
        let config = DinnerConfig::new(2, 10_000, 10, 10, 0, 0).unwrap();
        let table = table(config);
        let handle = tokio::spawn(Watchdog::new(table.clone()).run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        table.termination.trip(TerminalReason::Stopped);
        handle.await.unwrap();

        assert!(table.snapshots().iter().all(|s| s.state != PhilosopherState::Dead));
    }
}
