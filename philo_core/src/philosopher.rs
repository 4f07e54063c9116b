//! Philosopher Worker - one state machine per seat.
//!
//! ```text
//!            TimeThink                   both forks
//! Thinking ───────────► Hungry ──────────────────────► Eating
//!    ▲                    ▲  │ second fork busy:          │ TimeEat
//!    │                    └──┘ put first back, wait       ▼
//!    └─────────────── Sleeping ◄──── put forks down ─────┘
//!         TimeSleep                        │ meal target reached
//!                                          ▼
//!                                      Satisfied
//! ```
//!
//! Forks are taken lowest id first, which imposes a total order on every
//! acquisition around the ring and rules out circular wait. The second fork
//! is tried once; when it is busy the first goes back on the table at once
//! and the worker waits for the second to be put down, holding nothing. No
//! one sits on a single fork, so waits never chain around the table.
//!
//! Before each attempt a hungry worker steps back while a hungry neighbour
//! has gone longer without a meal. Without that, a recently fed philosopher
//! can win every race for a shared fork while its neighbour starves.
//!
//! Each suspension point (think, turn, fork wait, eat, sleep) races the
//! run's cancellation token, and whatever the worker holds when it stops is
//! put back before it exits.

use crate::error::ForkError;
use crate::seat::{MealRefused, PhilosopherState};
use crate::table::{Interrupted, Table};
use crate::termination::TerminalReason;
use crate::transcript::Activity;

use philo_env::{DinnerContext, ForkId, PhilosopherId};
use std::pin::pin;
use std::sync::Arc;
use tracing::{debug, error};

/// Why a worker left its loop early.
#[derive(Debug)]
enum Stop {
    /// The run ended (death, satisfaction, external stop).
    Cancelled,
    /// The fork bookkeeping was violated.
    Fault(ForkError),
}

impl From<ForkError> for Stop {
    fn from(err: ForkError) -> Self {
        match err {
            ForkError::Cancelled => Stop::Cancelled,
            other => Stop::Fault(other),
        }
    }
}

impl From<Interrupted> for Stop {
    fn from(_: Interrupted) -> Self {
        Stop::Cancelled
    }
}

impl From<MealRefused> for Stop {
    fn from(refused: MealRefused) -> Self {
        match refused {
            MealRefused::Fault(err) => Stop::from(err),
            MealRefused::Terminated | MealRefused::Dead | MealRefused::Starved => Stop::Cancelled,
        }
    }
}

/// A philosopher's concurrent worker.
pub(crate) struct Philosopher<Ctx: DinnerContext> {
    id: PhilosopherId,

    /// Adjacent forks, lowest id first.
    forks: (ForkId, ForkId),

    /// Forks currently held, in acquisition order.
    held: Vec<ForkId>,

    table: Arc<Table<Ctx>>,
}

impl<Ctx: DinnerContext> Philosopher<Ctx> {
    pub(crate) fn new(id: PhilosopherId, table: Arc<Table<Ctx>>) -> Self {
        let forks = table.forks.forks_for(id);
        Self {
            id,
            forks,
            held: Vec::with_capacity(2),
            table,
        }
    }

    /// Runs the cycle until the run ends or the meal target is reached.
    pub(crate) async fn run(mut self) {
        let result = self.dine().await;
        let cleanup = self.put_down_all();

        let fault = match (result, cleanup) {
            (Err(Stop::Fault(err)), _) | (_, Err(err)) => Some(err),
            _ => None,
        };
        if let Some(err) = fault {
            error!("philosopher {} hit a fork violation: {}", self.id, err);
            self.table.termination.trip(TerminalReason::Fault(err));
        }
        debug!("philosopher {} left the table", self.id);
    }

    async fn dine(&mut self) -> Result<(), Stop> {
        let config = self.table.config;
        loop {
            self.enter(PhilosopherState::Thinking)?;
            self.table.note(self.id, Activity::Thinking);
            self.table.pause(config.time_think()).await?;

            self.enter(PhilosopherState::Hungry)?;
            self.take_forks().await?;

            self.table.note(self.id, Activity::Eating);
            debug!("philosopher {} is eating", self.id);
            self.table.pause(config.time_eat()).await?;

            let meals = self.table.seat(self.id).finish_meal();
            self.put_down_all()?;
            self.table.note(self.id, Activity::Sleeping);
            debug!("philosopher {} finished meal {} and is sleeping", self.id, meals);

            self.table.meals.record(meals, &self.table.termination);
            if self.table.meals.is_satisfied(meals) {
                self.table.seat(self.id).set_state(PhilosopherState::Satisfied);
                self.table.note(self.id, Activity::Satisfied);
                debug!("philosopher {} is satisfied after {} meals", self.id, meals);
                return Ok(());
            }

            self.table.pause(config.time_sleep()).await?;
        }
    }

    /// Moves to a non-critical state. Fails if the watchdog declared this
    /// philosopher dead or the run is over.
    fn enter(&self, state: PhilosopherState) -> Result<(), Stop> {
        if self.table.termination.is_tripped() || !self.table.seat(self.id).set_state(state) {
            return Err(Stop::Cancelled);
        }
        Ok(())
    }

    /// Hungry until both forks are held and the meal has started.
    async fn take_forks(&mut self) -> Result<(), Stop> {
        let (first, second) = self.forks;
        let token = self.table.termination.token().clone();
        loop {
            self.wait_turn().await?;
            self.table.forks.acquire(first, self.id, &token).await?;
            self.took(first);

            match self.sit_down(second) {
                Ok(true) => {
                    self.took(second);
                    return Ok(());
                }
                Ok(false) => {}
                Err(refused) => {
                    if refused == MealRefused::Starved {
                        debug!("philosopher {} missed its deadline while hungry", self.id);
                    }
                    return Err(refused.into());
                }
            }

            debug!(
                "philosopher {} found fork {} busy and puts fork {} back",
                self.id, second, first
            );
            self.put_down_all()?;
            self.table.forks.wait_released(second, &token).await?;
        }
    }

    /// Claims `second` and starts the meal in one step under the seat lock.
    fn sit_down(&self, second: ForkId) -> Result<bool, MealRefused> {
        let table = &self.table;
        let now = table.now();
        table
            .seat(self.id)
            .begin_meal(now, table.config.time_die(), &table.termination, || {
                table.forks.try_acquire(second, self.id)
            })
    }

    /// Waits while a hungry neighbour has gone longer without a meal.
    async fn wait_turn(&self) -> Result<(), Stop> {
        let (left, right) = self.table.neighbours(self.id);
        let token = self.table.termination.token();
        loop {
            if token.is_cancelled() {
                return Err(Stop::Cancelled);
            }

            let mut left_changed = pin!(self.table.seat(left).changed());
            let mut right_changed = pin!(self.table.seat(right).changed());
            left_changed.as_mut().enable();
            right_changed.as_mut().enable();

            if !self.table.should_defer(self.id) {
                return Ok(());
            }

            tokio::select! {
                _ = token.cancelled() => return Err(Stop::Cancelled),
                _ = left_changed => {}
                _ = right_changed => {}
            }
        }
    }

    fn took(&mut self, fork: ForkId) {
        self.held.push(fork);
        self.table.note(self.id, Activity::TookFork(fork));
        debug!("philosopher {} has taken fork {}", self.id, fork);
    }

    /// Releases every held fork, most recently taken first.
    fn put_down_all(&mut self) -> Result<(), ForkError> {
        while let Some(fork) = self.held.pop() {
            self.table.note(self.id, Activity::PutDownFork(fork));
            self.table.forks.release(fork, self.id)?;
        }
        Ok(())
    }
}
