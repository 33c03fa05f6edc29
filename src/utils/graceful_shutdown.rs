use std::{fmt, sync::OnceLock, time::Duration};

use eyre::{Result, WrapErr};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Represents different shutdown reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Requested from inside the process, e.g. after a fatal server error
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => write!(f, "SIGINT"),
            ShutdownReason::Terminate => write!(f, "SIGTERM"),
            ShutdownReason::Requested => write!(f, "requested"),
        }
    }
}

/// Coordinates graceful shutdown: the first trigger wins, cancels the shared
/// token and starts the drain window.
pub struct GracefulShutdown {
    token: CancellationToken,
    reason: OnceLock<ShutdownReason>,
    /// Maximum time in-flight requests get to finish once shutdown starts
    grace_period: Duration,
}

impl GracefulShutdown {
    /// Create a new GracefulShutdown manager with default 30-second drain window
    pub fn new() -> Self {
        Self::with_grace_period(Duration::from_secs(30))
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            reason: OnceLock::new(),
            grace_period,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// A token that is cancelled when shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Check if shutdown has been initiated
    pub fn is_shutdown_initiated(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why shutdown was initiated, if it was.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Initiate shutdown. Later triggers are ignored.
    pub fn trigger(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(%reason, grace_period = ?self.grace_period, "Initiating graceful shutdown");
            self.token.cancel();
        } else {
            tracing::warn!(%reason, "Shutdown already initiated, ignoring signal");
        }
    }

    /// Resolve once shutdown has been initiated.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Listen for SIGINT/SIGTERM and trigger shutdown on the first one.
    /// Returns early if shutdown is triggered some other way.
    pub async fn run_signal_handler(&self) -> Result<()> {
        let terminate = wait_for_sigterm()?;

        tracing::info!("Signal handler started. Listening for SIGTERM and SIGINT");

        tokio::select! {
            result = signal::ctrl_c() => {
                result.wrap_err("Failed to listen for SIGINT")?;
                self.trigger(ShutdownReason::Interrupt);
            }
            _ = terminate => {
                self.trigger(ShutdownReason::Terminate);
            }
            _ = self.token.cancelled() => {}
        }

        Ok(())
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn wait_for_sigterm() -> Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm =
        signal(SignalKind::terminate()).wrap_err("Failed to register SIGTERM handler")?;
    Ok(async move {
        sigterm.recv().await;
    })
}

#[cfg(not(unix))]
fn wait_for_sigterm() -> Result<impl std::future::Future<Output = ()>> {
    // Only Ctrl+C is available off Unix
    Ok(std::future::pending::<()>())
}
