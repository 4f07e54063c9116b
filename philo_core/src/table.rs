//! Table - everything the tasks of one run share.

use crate::config::DinnerConfig;
use crate::fork::ForkRegistry;
use crate::meals::MealCounter;
use crate::seat::{PhilosopherState, Seat, SeatSnapshot};
use crate::termination::Termination;
use crate::transcript::{Activity, Transcript};

use philo_env::{DinnerContext, PhilosopherId};
use std::sync::Arc;
use std::time::Duration;

/// Marker returned when a pause was cut short by the cancellation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interrupted;

/// Shared state of a run: forks, seats, detectors and the clock.
pub(crate) struct Table<Ctx: DinnerContext> {
    pub(crate) ctx: Arc<Ctx>,
    /// Context time at which the table was set; all engine timestamps are relative to it.
    started: Duration,
    pub(crate) config: DinnerConfig,
    pub(crate) forks: ForkRegistry,
    pub(crate) seats: Vec<Seat>,
    pub(crate) termination: Termination,
    pub(crate) meals: MealCounter,
    transcript: Option<Arc<Transcript>>,
}

impl<Ctx: DinnerContext> Table<Ctx> {
    /// Sets the table: N free forks, N seats whose last meal is the start.
    pub(crate) fn new(ctx: Arc<Ctx>, config: DinnerConfig, transcript: Option<Arc<Transcript>>) -> Self {
        let n = config.num_philos();
        Self {
            started: ctx.now(),
            forks: ForkRegistry::new(n),
            seats: (0..n).map(|i| Seat::new(PhilosopherId(i), Duration::ZERO)).collect(),
            termination: Termination::new(),
            meals: MealCounter::new(config.meal_target(), n),
            ctx,
            config,
            transcript,
        }
    }

    /// Time since the table was set.
    pub(crate) fn now(&self) -> Duration {
        self.ctx.now().saturating_sub(self.started)
    }

    pub(crate) fn seat(&self, id: PhilosopherId) -> &Seat {
        &self.seats[id.index()]
    }

    /// Left and right neighbours. With two philosophers both are the same seat.
    pub(crate) fn neighbours(&self, id: PhilosopherId) -> (PhilosopherId, PhilosopherId) {
        let n = self.seats.len();
        let i = id.index();
        (PhilosopherId((i + n - 1) % n), PhilosopherId((i + 1) % n))
    }

    /// True while a hungry neighbour has gone longer without a meal than `id`.
    ///
    /// The comparison is strict on last meal time, so two neighbours never
    /// defer to each other and the hungriest philosopher at the table never
    /// defers at all.
    pub(crate) fn should_defer(&self, id: PhilosopherId) -> bool {
        let mine = self.seat(id).snapshot().last_meal;
        let (left, right) = self.neighbours(id);
        [left, right].into_iter().any(|other| {
            let theirs = self.seat(other).snapshot();
            theirs.state == PhilosopherState::Hungry && theirs.last_meal < mine
        })
    }

    /// Appends to the transcript, if one is attached.
    pub(crate) fn note(&self, id: PhilosopherId, activity: Activity) {
        if let Some(transcript) = &self.transcript {
            transcript.record(self.now(), id, activity);
        }
    }

    /// Sleeps for `duration` unless the run ends first.
    pub(crate) async fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        let token = self.termination.token();
        if token.is_cancelled() {
            return Err(Interrupted);
        }
        tokio::select! {
            _ = token.cancelled() => Err(Interrupted),
            _ = self.ctx.sleep(duration) => Ok(()),
        }
    }

    /// Committed meal count of every philosopher, by id.
    pub(crate) fn tallies(&self) -> Vec<u32> {
        self.seats.iter().map(Seat::meals).collect()
    }

    pub(crate) fn snapshots(&self) -> Vec<SeatSnapshot> {
        self.seats.iter().map(Seat::snapshot).collect()
    }
}
