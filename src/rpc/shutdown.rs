//! Server-wide shutdown signal.
//!
//! There is exactly one way to stop a server: [`Shutdown::trigger`]. It is
//! idempotent and may be called from the idle supervisor, a Ctrl-C handler or
//! a test. Listener, sessions and supervisor all wait on the same token.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// No client activity for the configured idle timeout
    IdleTimeout,
    /// Interrupt from the terminal or the service manager
    Interrupt,
    /// Requested programmatically
    Requested,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleTimeout => write!(f, "idle timeout"),
            Self::Interrupt => write!(f, "interrupt"),
            Self::Requested => write!(f, "requested"),
        }
    }
}

#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    running: AtomicBool,
    triggered: AtomicBool,
    reason: OnceLock<ShutdownReason>,
    token: CancellationToken,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let inner = Inner {
            running: AtomicBool::new(true),
            ..Default::default()
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// True until shutdown has been triggered.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Stop the server. Returns false if shutdown was already under way.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            debug!(%reason, "Shutdown already in progress");
            return false;
        }

        let _ = self.inner.reason.set(reason);
        self.inner.running.store(false, Ordering::SeqCst);
        info!(%reason, "Shutting down server");
        self.inner.token.cancel();
        true
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.inner.reason.get().copied()
    }

    /// Child token cancelled together with the server. Used per session so a
    /// single session can also be cancelled on its own.
    pub fn child_token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) {
        self.inner.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        assert!(shutdown.is_running());

        assert!(shutdown.trigger(ShutdownReason::IdleTimeout));
        assert!(!shutdown.trigger(ShutdownReason::Interrupt));

        assert!(!shutdown.is_running());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::IdleTimeout));
    }

    #[test]
    fn trigger_cancels_child_tokens() {
        let shutdown = Shutdown::new();
        let child = shutdown.child_token();
        assert!(!child.is_cancelled());

        shutdown.trigger(ShutdownReason::Requested);
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn wait_resolves_after_trigger_from_clone() {
        let shutdown = Shutdown::new();
        let remote = shutdown.clone();

        tokio::spawn(async move {
            remote.trigger(ShutdownReason::Requested);
        });

        shutdown.wait().await;
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Requested));
    }
}
