//! Shutdown signal handling.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal so the relay can shut down gracefully.
///
/// # Platform Support
///
/// * **Unix platforms**: SIGINT and SIGTERM
/// * **Windows**: Ctrl+C
///
/// # Returns
///
/// `Ok(())` once a signal arrives, or an error if the signal listeners
/// could not be installed.
///
/// # Example
///
/// ```no_run
/// # async fn run(server: relay_core::RelayServer) -> anyhow::Result<()> {
/// wait_for_shutdown_signal().await?;
/// server.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("📡 Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
    }

    Ok(())
}
