//! OS signals that end a run early.
//!
//! On Unix: `SIGINT` (Ctrl-C) and `SIGTERM`. Elsewhere: Ctrl-C only.

/// Completes when the process is asked to stop.
///
/// Returns `Err` if the signal listeners could not be registered.
#[cfg(unix)]
pub async fn wait_for_stop_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = sigterm.recv() => Ok(()),
    }
}

/// Completes when the process is asked to stop.
#[cfg(not(unix))]
pub async fn wait_for_stop_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
