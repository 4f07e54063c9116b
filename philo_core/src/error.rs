//! Error types for the simulation engine.
//!
//! - [`ConfigError`]: raw parameters rejected before the engine runs.
//! - [`ForkError`]: fork registry results; everything except `Cancelled`
//!   is an internal consistency violation.
//! - [`SimError`]: run failures that fall outside the outcome model.

use philo_env::{ForkId, PhilosopherId};
use thiserror::Error;

/// A raw parameter outside its accepted range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Fewer than two philosophers at the table.
    #[error("invalid number of philosophers: {0} (need at least 2)")]
    TooFewPhilosophers(i64),

    /// TimeDie must be positive.
    #[error("invalid TimeDie: {0}ms (must be > 0)")]
    TimeDie(i64),

    /// TimeEat must be positive.
    #[error("invalid TimeEat: {0}ms (must be > 0)")]
    TimeEat(i64),

    /// TimeSleep must be positive.
    #[error("invalid TimeSleep: {0}ms (must be > 0)")]
    TimeSleep(i64),

    /// TimeThink must not be negative.
    #[error("invalid TimeThink: {0}ms (must be >= 0)")]
    TimeThink(i64),

    /// NumEat must not be negative.
    #[error("invalid NumEat: {0} (must be >= 0)")]
    NumEat(i64),
}

/// Result of a fork registry operation that did not go as planned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkError {
    /// The wait was abandoned because the cancellation signal fired.
    #[error("fork wait cancelled")]
    Cancelled,

    /// A philosopher tried to take a fork it already holds.
    #[error("philosopher {philosopher} acquired fork {fork} twice")]
    AlreadyHeld {
        fork: ForkId,
        philosopher: PhilosopherId,
    },

    /// A philosopher released a fork it does not hold.
    #[error("philosopher {philosopher} released fork {fork} held by {holder:?}")]
    NotHolder {
        fork: ForkId,
        philosopher: PhilosopherId,
        holder: Option<PhilosopherId>,
    },

    /// The fork id is outside the ring.
    #[error("fork {0} is not on the table")]
    UnknownFork(ForkId),
}

impl ForkError {
    /// Returns true if this error breaks the mutual-exclusion bookkeeping.
    pub fn is_violation(&self) -> bool {
        !matches!(self, ForkError::Cancelled)
    }
}

/// Failures of a run that are not simulation outcomes.
#[derive(Debug, Error)]
pub enum SimError {
    /// A worker or watchdog task panicked.
    #[error("task {task} panicked: {message}")]
    TaskPanicked {
        /// Task name (`philosopher-3`, `watchdog`).
        task: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}
