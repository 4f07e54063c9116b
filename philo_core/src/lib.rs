//! Philo Core - Deadlock-free Dining Philosophers Engine
//!
//! N philosophers sit around a table with one fork between each pair of
//! neighbours. Each philosopher is an independent task that thinks, takes
//! both adjacent forks, eats, puts them back and sleeps, until one of three
//! things happens:
//! 1. **Starvation**: a philosopher goes longer than TimeDie without starting a meal
//! 2. **Satisfaction**: every philosopher has eaten NumEat meals
//! 3. **Stop**: the caller (or a signal handler) asks the run to end
//!
//! ```text
//!             ┌──────────── Table ─────────────┐
//!             │ ForkRegistry   Seats   Meals   │
//!             │ Termination (latch + cancel)   │
//!             └───▲───────────▲───────────▲────┘
//!   Philosopher 0 ┘   ...     │           └ Watchdog
//!                    Philosopher N-1
//! ```
//!
//! The first terminal event wins; everything after it is a clean shutdown.

pub mod config;
pub mod error;
pub mod fork;
pub mod meals;
pub mod outcome;
pub mod seat;
pub mod supervisor;
pub mod termination;
pub mod transcript;

mod philosopher;
mod table;
mod watchdog;

// Re-export key types for convenience
pub use config::{DinnerConfig, Params};
pub use error::{ConfigError, ForkError, SimError};
pub use fork::ForkRegistry;
pub use meals::MealCounter;
pub use outcome::SimulationOutcome;
pub use seat::{PhilosopherState, Seat, SeatSnapshot};
pub use supervisor::{AliveProbe, Dinner, DinnerHandle, DEFAULT_GRACE};
pub use termination::{TerminalReason, Termination};
pub use transcript::{find_fork_conflict, Activity, Transcript, TranscriptEntry};

pub use philo_env::{DinnerContext, ForkId, PhilosopherId, TokioContext};
