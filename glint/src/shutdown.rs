//! Signal handling for glint nodes
//!
//! SIGTERM and SIGINT never kill a node outright. On the orchestrator they
//! cancel the session token, which the session controller turns into a
//! single sentinel emission. Followers only log the signal and keep waiting
//! for that sentinel.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which signal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

/// Shutdown coordinator
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token the session controller polls.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request shutdown without a signal.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token on the first SIGINT or SIGTERM.
    pub fn listen(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                signal = wait_for_signal() => {
                    info!(?signal, "Draining session");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        })
    }

    /// Log every SIGINT or SIGTERM until `until` is cancelled, without acting on it.
    pub fn log_only(until: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    signal = wait_for_signal() => {
                        info!(?signal, "Followers wait for the orchestrator's sentinel");
                    }
                    _ = until.cancelled() => break,
                }
            }
        })
    }
}

/// Wait for a signal listener to finish, reporting whether it exited cleanly.
pub async fn join_listener(listener: JoinHandle<()>) -> bool {
    match listener.await {
        Ok(()) => true,
        Err(e) if e.is_cancelled() => true,
        Err(e) => {
            warn!("Signal listener failed: {}", e);
            false
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for SIGINT or SIGTERM.
///
/// If a handler cannot be installed the corresponding branch never fires.
pub async fn wait_for_signal() -> Signal {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install SIGINT handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => Signal::Interrupt,
        _ = terminate => Signal::Terminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_shutdown_cancels_token() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let listener = coordinator.listen();

        assert!(!coordinator.is_shutdown_requested());
        coordinator.shutdown();
        assert!(token.is_cancelled());
        listener.await.unwrap();
    }

    #[tokio::test]
    async fn test_log_only_stops_with_its_token() {
        let until = CancellationToken::new();
        let handle = ShutdownCoordinator::log_only(until.clone());
        until.cancel();
        assert!(join_listener(handle).await);
    }

    #[tokio::test]
    async fn test_join_listener_reports_a_panicked_listener() {
        let handle = tokio::spawn(async { panic!("listener blew up") });
        assert!(!join_listener(handle).await);

        let aborted = tokio::spawn(std::future::pending::<()>());
        aborted.abort();
        assert!(join_listener(aborted).await);
    }
}
