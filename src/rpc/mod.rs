//! RPC server and client.
//!
//! Exposes the function registry over TCP with newline-delimited JSON
//! envelopes.
//!
//! ## Architecture
//!
//! - `protocol`: request/response envelopes and their codec
//! - `framing`: one message per line over a byte stream
//! - `methods`: method dispatcher
//! - `session`: per-connection request loop and the session set
//! - `transport`: TCP listener, one task per connection
//! - `supervisor`: activity clock and idle timeout
//! - `shutdown`: the single, idempotent stop signal
//! - `client`: persistent connection used by the console

pub mod client;
pub mod framing;
pub mod methods;
pub mod protocol;
pub mod session;
pub mod shutdown;
pub mod supervisor;
mod transport;

use std::net::SocketAddr;

use anyhow::Context;

use crate::context::ServerContext;
use supervisor::IdleSupervisor;
use transport::Transport;

pub use client::{CallOutcome, ClientError, RpcClient};
pub use methods::Dispatcher;
pub use protocol::{Request, RequestId, Response, RpcError};
pub use shutdown::{Shutdown, ShutdownReason};

/// RPC server exposing the registry to clients.
pub struct RpcServer {
    ctx: ServerContext,
    transport: Transport,
}

impl RpcServer {
    /// Bind the configured address. Port 0 picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(ctx: ServerContext) -> anyhow::Result<Self> {
        let address = ctx.config.address();
        let transport = Transport::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;

        Ok(Self { ctx, transport })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Handle for stopping the server from elsewhere.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.ctx.shutdown.clone()
    }

    /// Serve until shutdown. Starts the idle supervisor, runs the accept
    /// loop, and returns once every session has closed.
    pub async fn run(self) -> ShutdownReason {
        let ctx = self.ctx;
        ctx.clock.touch();

        let supervisor = tokio::spawn(
            IdleSupervisor::new(
                ctx.clock.clone(),
                ctx.shutdown.clone(),
                ctx.config.idle_timeout(),
                ctx.config.poll_interval(),
            )
            .run(),
        );

        self.transport.listen(ctx.clone()).await;
        let _ = supervisor.await;

        ctx.shutdown.reason().unwrap_or(ShutdownReason::Requested)
    }
}
