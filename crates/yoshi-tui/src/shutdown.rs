//! Process-wide shutdown hook.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use yoshi_core::{Error, Result};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Why we are shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Interrupted from the keyboard.
    CtrlC,
    /// Asked to terminate by another process.
    Sigterm,
}

/// Cancels a token when the process is asked to stop.
///
/// Installed once at program start; the session loop watches the token and
/// closes itself when it fires.
#[derive(Debug)]
pub struct ShutdownHook {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl ShutdownHook {
    /// Install the hook and start listening for signals.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if a hook was already installed.
    pub fn install() -> Result<Self> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(Error::Precondition("shutdown hook is already installed".into()));
        }

        let token = CancellationToken::new();
        let listener = tokio::spawn({
            let token = token.clone();
            async move {
                let reason = tokio::select! {
                    () = token.cancelled() => return,
                    reason = wait_ctrl_c() => reason,
                    reason = wait_sigterm() => reason,
                };
                tracing::info!(?reason, "shutdown requested");
                token.cancel();
            }
        });

        Ok(Self { token, listener })
    }

    /// Token cancelled on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request shutdown without a signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ShutdownHook {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn wait_ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "unable to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    ShutdownReason::CtrlC
}

#[cfg(unix)]
async fn wait_sigterm() -> ShutdownReason {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sig) => {
            sig.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "unable to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
    ShutdownReason::Sigterm
}

#[cfg(not(unix))]
async fn wait_sigterm() -> ShutdownReason {
    std::future::pending::<()>().await;
    ShutdownReason::Sigterm
}
