//! Dining Philosophers Environment Abstraction Layer
//!
//! This crate isolates the two things the simulation engine needs from the
//! outside world:
//! - Time (`now()`, `sleep()`)
//! - Identity of the table's seats and forks (`PhilosopherId`, `ForkId`)
//!
//! # Core Concept
//!
//! The engine never touches `std::time::Instant` or `tokio::time` directly.
//! Every deadline and every suspension goes through a [`DinnerContext`], so the
//! same worker code runs on the wall clock in production and on tokio's
//! paused clock in tests (`#[tokio::test(start_paused = true)]`), where the
//! runtime jumps straight to the next timer and runs are reproducible.
//!
//! # Example
//!
//! ```ignore
//! use philo_env::{DinnerContext, TokioContext};
//!
//! async fn think<Ctx: DinnerContext>(ctx: &Ctx, stop: &CancellationToken) {
//!     tokio::select! {
//!         _ = stop.cancelled() => {}
//!         _ = ctx.sleep(Duration::from_millis(80)) => {}
//!     }
//! }
//! ```

mod context;
mod types;
mod tokio_impl;

pub use context::DinnerContext;
pub use types::{ForkId, PhilosopherId};
pub use tokio_impl::TokioContext;
