//! TCP transport layer for the RPC server.
//!
//! Accepts connections and hands each one to its own session task. The
//! accept loop races every accept against the shutdown signal, so shutdown
//! never leaves it blocked.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::context::ServerContext;
use crate::logging::LogThrottle;

use super::session::handle_session;
use super::shutdown::Shutdown;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Manages the TCP transport layer.
pub struct Transport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Transport {
    pub async fn bind(address: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until shutdown, then wait for every session to end.
    /// The listening socket is closed when this returns.
    pub async fn listen(self, ctx: ServerContext) {
        info!(addr = %self.local_addr, "RPC server listening");

        let sessions = TaskTracker::new();
        let accept_errors = LogThrottle::new(Duration::from_secs(5));

        while ctx.shutdown.is_running() {
            tokio::select! {
                biased;
                _ = ctx.shutdown.wait() => break,
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            let cancel = ctx.shutdown.child_token();
                            let id = ctx.sessions.insert(peer, cancel.clone());
                            info!(peer = %peer, session = %id, "Client connected");
                            sessions.spawn(handle_session(stream, peer, id, cancel, ctx.clone()));
                        }
                        Err(e) if !ctx.shutdown.is_running() => {
                            debug!(error = %e, "Accept interrupted by shutdown");
                        }
                        Err(e) => {
                            if accept_errors.should_log() {
                                error!(error = %e, "Failed to accept connection");
                            }
                            // Errors like EMFILE persist; don't spin on them.
                            back_off(&ctx.shutdown).await;
                        }
                    }
                }
            }
        }

        drop(self.listener);
        if !ctx.sessions.is_empty() {
            for session in ctx.sessions.snapshot() {
                debug!(peer = %session.peer, session = %session.id, state = ?session.state, "Closing session");
            }
        }
        let open = ctx.sessions.close_all();
        debug!(open, "Listener closed, waiting for sessions");

        sessions.close();
        sessions.wait().await;
        info!("RPC server stopped");
    }
}

/// Pause after a failed accept, waking early on shutdown.
async fn back_off(shutdown: &Shutdown) {
    tokio::select! {
        _ = shutdown.wait() => {}
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
    }
}
