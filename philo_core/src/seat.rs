//! Per-philosopher shared record.
//!
//! A [`Seat`] is written only by its own worker (state, last meal, meal
//! count) and read by the watchdog sweep and the supervisor. The watchdog's
//! one write, the transition to `Dead`, happens under the same lock as the
//! worker's transition to `Eating`; that shared lock is what rules out a
//! false death for a philosopher who sat down just before the deadline.
//!
//! The second fork is claimed inside that same critical section, so a meal
//! starts at the instant its second fork is taken. Lock order is seat, then
//! fork slot; nothing takes a seat lock while holding a fork slot.
//!
//! Every state change wakes the seat's `changed` waiters. Neighbours that
//! defer to a hungrier philosopher wait on it.

use crate::error::ForkError;
use crate::termination::{TerminalReason, Termination};
use philo_env::PhilosopherId;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Where a philosopher is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhilosopherState {
    Thinking,
    Hungry,
    Eating,
    Sleeping,
    /// Reached the meal target and left the table.
    Satisfied,
    /// Declared dead by the watchdog.
    Dead,
}

impl std::fmt::Display for PhilosopherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PhilosopherState::Thinking => "thinking",
            PhilosopherState::Hungry => "hungry",
            PhilosopherState::Eating => "eating",
            PhilosopherState::Sleeping => "sleeping",
            PhilosopherState::Satisfied => "satisfied",
            PhilosopherState::Dead => "dead",
        };
        f.write_str(s)
    }
}

/// Point-in-time copy of a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatSnapshot {
    pub state: PhilosopherState,
    pub last_meal: Duration,
    pub meals: u32,
}

#[derive(Debug)]
struct SeatInner {
    state: PhilosopherState,
    last_meal: Duration,
    meals: u32,
}

/// Why a worker may not start eating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MealRefused {
    /// A terminal event has already been recorded.
    Terminated,
    /// The watchdog got here first.
    Dead,
    /// The deadline passed before the second fork came free. The next
    /// watchdog sweep declares the death.
    Starved,
    /// Claiming the second fork broke the fork bookkeeping.
    Fault(ForkError),
}

/// Synchronized state of one philosopher.
#[derive(Debug)]
pub struct Seat {
    id: PhilosopherId,
    inner: Mutex<SeatInner>,

    /// Woken on every state change.
    changed: Notify,
}

impl Seat {
    /// Creates a seat with the last meal set to the simulation start.
    pub fn new(id: PhilosopherId, start: Duration) -> Self {
        Self {
            id,
            inner: Mutex::new(SeatInner {
                state: PhilosopherState::Thinking,
                last_meal: start,
                meals: 0,
            }),
            changed: Notify::new(),
        }
    }

    pub fn id(&self) -> PhilosopherId {
        self.id
    }

    pub fn snapshot(&self) -> SeatSnapshot {
        let inner = self.lock();
        SeatSnapshot {
            state: inner.state,
            last_meal: inner.last_meal,
            meals: inner.meals,
        }
    }

    pub fn meals(&self) -> u32 {
        self.lock().meals
    }

    /// Resolves on the next state change of this seat. Enable it before
    /// reading the seat so a change in between is not missed.
    pub(crate) fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }

    /// Moves between the non-critical states (Thinking, Hungry, Sleeping,
    /// Satisfied). Returns false and leaves the seat alone if it is Dead.
    pub(crate) fn set_state(&self, state: PhilosopherState) -> bool {
        {
            let mut inner = self.lock();
            if inner.state == PhilosopherState::Dead {
                return false;
            }
            inner.state = state;
        }
        self.changed.notify_waiters();
        true
    }

    /// Hungry -> Eating, at the instant the second fork is taken.
    ///
    /// `claim` takes the second fork and runs under the seat lock, after the
    /// checks. Returns `Ok(false)` when the fork was busy, leaving the seat
    /// Hungry. On success the last meal is stamped with `now`.
    ///
    /// Refused without calling `claim` when the run is over, the watchdog
    /// has declared this philosopher dead, or `now` is already past the
    /// deadline.
    pub(crate) fn begin_meal<F>(
        &self,
        now: Duration,
        time_die: Duration,
        termination: &Termination,
        claim: F,
    ) -> Result<bool, MealRefused>
    where
        F: FnOnce() -> Result<bool, ForkError>,
    {
        {
            let mut inner = self.lock();
            if inner.state == PhilosopherState::Dead {
                return Err(MealRefused::Dead);
            }
            if termination.is_tripped() {
                return Err(MealRefused::Terminated);
            }
            if now.saturating_sub(inner.last_meal) > time_die {
                return Err(MealRefused::Starved);
            }
            if !claim().map_err(MealRefused::Fault)? {
                return Ok(false);
            }
            inner.state = PhilosopherState::Eating;
            inner.last_meal = inner.last_meal.max(now);
        }
        self.changed.notify_waiters();
        Ok(true)
    }

    /// Eating -> Sleeping after a completed meal. Returns the new meal count.
    pub(crate) fn finish_meal(&self) -> u32 {
        let meals = {
            let mut inner = self.lock();
            inner.meals += 1;
            if inner.state == PhilosopherState::Eating {
                inner.state = PhilosopherState::Sleeping;
            }
            inner.meals
        };
        self.changed.notify_waiters();
        meals
    }

    /// Watchdog check: declares this philosopher dead if it has gone more
    /// than `time_die` since its last meal while not eating.
    ///
    /// The death is only committed if this call wins the termination latch,
    /// so at most one philosopher is ever marked dead. Returns true when it
    /// did.
    pub(crate) fn check_starvation(&self, now: Duration, time_die: Duration, termination: &Termination) -> bool {
        {
            let mut inner = self.lock();
            match inner.state {
                PhilosopherState::Eating | PhilosopherState::Satisfied | PhilosopherState::Dead => return false,
                _ => {}
            }
            if now.saturating_sub(inner.last_meal) <= time_die {
                return false;
            }
            if !termination.trip(TerminalReason::PhilosopherDied { id: self.id, at: now }) {
                return false;
            }
            inner.state = PhilosopherState::Dead;
        }
        self.changed.notify_waiters();
        true
    }

    fn lock(&self) -> MutexGuard<'_, SeatInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
