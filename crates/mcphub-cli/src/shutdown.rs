// ABOUTME: Signal handling for the mcphub process.
// ABOUTME: Exits on Ctrl+C or SIGTERM without stopping children itself.

use anyhow::{Context, Result};
use tokio::signal;

/// Wait for Ctrl+C or SIGTERM and return which one arrived.
///
/// Children are not killed here. They receive the terminal's signal through
/// the shared process group, or are stopped by the service manager that
/// stops the hub. Adapters started under a detached session outlive the hub.
pub async fn wait_for_signal() -> Result<&'static str> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .context("failed to install Ctrl+C handler")
            .map(|_| "Ctrl+C")
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok("SIGTERM")
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<&'static str>>();

    tokio::select! {
        received = ctrl_c => received,
        received = terminate => received,
    }
}
