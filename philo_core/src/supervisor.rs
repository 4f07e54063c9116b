//! Simulation Supervisor - sets the table, starts every task, waits for the
//! first terminal event and shuts the run down.
//!
//! ```text
//! Dinner::spawn()
//!   Table (forks, seats, latch, meal counter)
//!     ├─► Philosopher 0 .. N-1   (JoinSet)
//!     └─► Watchdog               (JoinSet)
//!
//! DinnerHandle::join()
//!   1. wait for Termination::tripped()       (death / all satisfied / stop / fault)
//!   2. drain the JoinSet within the grace period
//!        └─ grace exceeded → abort_all() and drain again
//!   3. SimulationOutcome { reason, meals, elapsed }
//! ```
//!
//! Tasks run on the caller's Tokio runtime. `spawn` must be called from
//! inside one.

use crate::config::DinnerConfig;
use crate::error::SimError;
use crate::outcome::SimulationOutcome;
use crate::philosopher::Philosopher;
use crate::seat::SeatSnapshot;
use crate::table::Table;
use crate::termination::TerminalReason;
use crate::transcript::Transcript;
use crate::watchdog::Watchdog;

use philo_env::{DinnerContext, PhilosopherId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info, warn};

/// Default time allowed for tasks to stop after the terminal event.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

/// Builder for a simulation run.
pub struct Dinner<Ctx: DinnerContext> {
    ctx: Arc<Ctx>,
    config: DinnerConfig,
    grace: Duration,
    transcript: Option<Arc<Transcript>>,
}

impl<Ctx: DinnerContext> Dinner<Ctx> {
    /// Creates a run for `config` on the clock of `ctx`.
    pub fn new(config: DinnerConfig, ctx: Arc<Ctx>) -> Self {
        Self {
            ctx,
            config,
            grace: DEFAULT_GRACE,
            transcript: None,
        }
    }

    /// Sets how long tasks get to stop before they are aborted.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Records every philosopher activity into `transcript`.
    pub fn with_transcript(mut self, transcript: Arc<Transcript>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Runs the simulation to its terminal event and returns the outcome.
    pub async fn run(self) -> Result<SimulationOutcome, SimError> {
        self.spawn().join().await
    }

    /// Starts every philosopher and the watchdog, returning a handle to the
    /// running simulation.
    pub fn spawn(self) -> DinnerHandle<Ctx> {
        let table = Arc::new(Table::new(self.ctx, self.config, self.transcript));
        let alive = AliveProbe::default();
        let mut handle = DinnerHandle {
            table: table.clone(),
            tasks: JoinSet::new(),
            names: HashMap::new(),
            alive: alive.clone(),
            grace: self.grace,
        };

        info!("seating {} ({})", self.config.num_philos(), self.config.to_params());

        for i in 0..self.config.num_philos() {
            let worker = Philosopher::new(PhilosopherId(i), table.clone());
            handle.spawn_tracked(format!("philosopher-{i}"), worker.run());
        }
        handle.spawn_tracked("watchdog".to_string(), Watchdog::new(table).run());

        handle
    }
}

/// Counts the tasks of a run that are still running.
///
/// Cloned probes share the count; it stays readable after the run ended.
#[derive(Debug, Clone, Default)]
pub struct AliveProbe(Arc<AtomicUsize>);

impl AliveProbe {
    /// Number of worker and watchdog tasks that have not finished.
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn enter(&self) -> AliveGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        AliveGuard(self.0.clone())
    }
}

/// Decrements the probe when the task's future is dropped, whether it
/// completed, panicked or was aborted.
struct AliveGuard(Arc<AtomicUsize>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A running simulation.
///
/// Dropping the handle without joining aborts every task.
pub struct DinnerHandle<Ctx: DinnerContext> {
    table: Arc<Table<Ctx>>,
    tasks: JoinSet<()>,
    names: HashMap<Id, String>,
    alive: AliveProbe,
    grace: Duration,
}

impl<Ctx: DinnerContext> DinnerHandle<Ctx> {
    fn spawn_tracked<F>(&mut self, name: String, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.alive.enter();
        let abort = self.tasks.spawn(async move {
            let _guard = guard;
            task.await;
        });
        self.names.insert(abort.id(), name);
    }

    /// Committed meal count of every philosopher right now.
    pub fn snapshot(&self) -> Vec<u32> {
        self.table.tallies()
    }

    /// State, last meal and meal count of every philosopher right now.
    pub fn seats(&self) -> Vec<SeatSnapshot> {
        self.table.snapshots()
    }

    /// Requests an external stop. Returns false if the run had already
    /// reached a terminal event.
    pub fn stop(&self) -> bool {
        self.table.termination.trip(TerminalReason::Stopped)
    }

    /// True once a terminal event has been recorded.
    pub fn is_finished(&self) -> bool {
        self.table.termination.is_tripped()
    }

    /// A probe that keeps reporting the number of live tasks after `join`.
    pub fn alive(&self) -> AliveProbe {
        self.alive.clone()
    }

    /// Waits for the terminal event, stops every task and builds the outcome.
    pub async fn join(self) -> Result<SimulationOutcome, SimError> {
        self.join_until(std::future::pending::<()>()).await
    }

    /// Like [`join`](Self::join), but completion of `stop` requests an
    /// external stop (a signal handler, a deadline).
    pub async fn join_until<F>(mut self, stop: F) -> Result<SimulationOutcome, SimError>
    where
        F: Future<Output = ()>,
    {
        let mut panicked = None;
        let mut stop_armed = true;
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = self.table.termination.tripped() => break,
                _ = &mut stop, if stop_armed => {
                    stop_armed = false;
                    if self.table.termination.trip(TerminalReason::Stopped) {
                        info!("external stop requested");
                    }
                }
                joined = self.tasks.join_next_with_id() => match joined {
                    Some(Ok((id, ()))) => {
                        self.names.remove(&id);
                    }
                    Some(Err(err)) => {
                        record_join_error(err, &mut self.names, &mut panicked);
                        self.table.termination.trip(TerminalReason::Stopped);
                    }
                    None => {
                        self.table.termination.trip(TerminalReason::Stopped);
                    }
                },
            }
        }

        let drained = tokio::select! {
            _ = drain(&mut self.tasks, &mut self.names, &mut panicked) => true,
            _ = self.table.ctx.sleep(self.grace) => false,
        };
        if !drained {
            let mut stuck: Vec<&String> = self.names.values().collect();
            stuck.sort();
            warn!(
                "grace period of {:?} exceeded, aborting {} task(s): {:?}",
                self.grace,
                self.tasks.len(),
                stuck
            );
            self.tasks.abort_all();
            drain(&mut self.tasks, &mut self.names, &mut panicked).await;
        }

        if let Some(err) = panicked {
            error!("{}", err);
            return Err(err);
        }

        let reason = self
            .table
            .termination
            .reason()
            .cloned()
            .unwrap_or(TerminalReason::Stopped);
        let outcome = SimulationOutcome {
            reason,
            meals: self.table.tallies(),
            elapsed: self.table.now(),
        };
        info!(
            "dinner over after {}ms: {} ({} meals)",
            outcome.elapsed.as_millis(),
            outcome.reason.as_label(),
            outcome.total_meals()
        );
        Ok(outcome)
    }
}

async fn drain(tasks: &mut JoinSet<()>, names: &mut HashMap<Id, String>, panicked: &mut Option<SimError>) {
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, ())) => {
                names.remove(&id);
            }
            Err(err) => record_join_error(err, names, panicked),
        }
    }
}

/// Keeps the first panic; aborted tasks are expected after a grace overrun.
fn record_join_error(err: JoinError, names: &mut HashMap<Id, String>, panicked: &mut Option<SimError>) {
    let task = names.remove(&err.id()).unwrap_or_else(|| "unknown".to_string());
    if !err.is_panic() || panicked.is_some() {
        return;
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    *panicked = Some(SimError::TaskPanicked { task, message });
}
