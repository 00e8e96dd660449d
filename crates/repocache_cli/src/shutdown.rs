use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use console::Term;

/// Global shutdown flag for graceful termination.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// How often an interruptible wait checks the flag.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Check if shutdown has been requested.
#[inline]
pub(crate) fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

/// Request shutdown.
#[inline]
fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
}

/// Sleep for `duration`, returning early once shutdown is requested.
pub(crate) async fn sleep_unless_shutdown(duration: Duration) {
    let deadline = tokio::time::Instant::now() + duration;
    while !is_shutdown_requested() {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep((deadline - now).min(POLL_INTERVAL)).await;
    }
}

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C lets the current refetch run finish; the second exits
/// immediately, which rolls back any open transaction.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing current run...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing current run");
        }

        request_shutdown();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_unless_shutdown_waits_for_short_durations() {
        let start = std::time::Instant::now();
        sleep_unless_shutdown(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
