//! OS signal handling.

use tokio::task::JoinHandle;
use tracing::{info, warn};
use tollgate_terminal::ExitSignal;

/// Wait for SIGINT or SIGTERM (Ctrl+C elsewhere).
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            _ = sigint.recv() => Ok("SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}

/// Request an orderly exit on the first signal.
///
/// The task ends on its own once `exit` leaves `Running` for another reason.
pub fn spawn_signal_listener(exit: ExitSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = shutdown_signal() => match signal {
                Ok(name) => {
                    info!(signal = name, "Shutdown requested");
                    exit.exit();
                }
                Err(e) => warn!(error = %e, "Failed to install signal handlers"),
            },
            _ = exit.stopped() => {}
        }
    })
}
