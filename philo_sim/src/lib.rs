//! Philo Sim - command line front end for the dining philosophers engine
//!
//! Wraps [`philo_core`] with the pieces a runnable program needs:
//! - **Scenarios**: named self-checks that run the engine on the real clock
//!   and assert on the outcome (`banquet`, `starvation`, `no_deadlock`, `satisfied`)
//! - **Report**: a human-readable summary and the exit code of an outcome
//! - **Exporter**: parameters, outcome and transcript as one JSON document
//! - **Shutdown**: Ctrl-C / SIGTERM turned into an external stop
//!
//! # Usage
//!
//! ```ignore
//! use philo_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new().run(ScenarioId::Banquet).await;
//! assert!(result.passed);
//! ```

pub mod exporter;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod shutdown;

pub use exporter::{OutcomeExport, RunExport};
pub use runner::{run_all, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
