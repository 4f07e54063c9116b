//! Core environment context trait for the simulation engine.

use async_trait::async_trait;
use std::time::Duration;

/// The engine's only interface to the passage of time.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
///
/// # Monotonicity
///
/// `now()` is measured from context creation and never goes backwards.
/// Every timestamp the engine stores (last meal, death time, transcript
/// entries) is a value returned by `now()`, so all of them share one origin.
#[async_trait]
pub trait DinnerContext: Send + Sync + 'static {
    /// Returns the monotonic time elapsed since context creation.
    fn now(&self) -> Duration;

    /// Suspends the calling task for the given duration.
    ///
    /// Callers race this against their cancellation token; implementations
    /// must be cancel-safe (dropping the future abandons the sleep).
    async fn sleep(&self, duration: Duration);
}
