//! Per-connection session handling.
//!
//! Each accepted connection is served by its own task running
//! [`handle_session`]. Requests on one connection are answered strictly in
//! arrival order. The session closes its own socket on disconnect or error;
//! server shutdown cancels the session's token, which closes it too.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::ServerContext;

use super::framing::{FrameError, FrameReader, write_frame};
use super::methods::Dispatcher;
use super::protocol::{Response, RpcError, decode_request, encode_response};

pub type SessionId = Uuid;

/// Lifecycle of a connection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closing,
    Closed,
}

/// Snapshot of a tracked session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub state: SessionState,
}

struct SessionEntry {
    peer: SocketAddr,
    state: SessionState,
    cancel: CancellationToken,
}

/// Lock-guarded set of live sessions, used for bulk shutdown.
#[derive(Clone, Default)]
pub struct SessionSet {
    inner: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new session. Its socket closes when `cancel` fires.
    pub fn insert(&self, peer: SocketAddr, cancel: CancellationToken) -> SessionId {
        let id = Uuid::now_v7();
        let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(
            id,
            SessionEntry {
                peer,
                state: SessionState::Open,
                cancel,
            },
        );
        id
    }

    fn set_state(&self, id: SessionId, state: SessionState) {
        let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = sessions.get_mut(&id) {
            entry.state = state;
        }
    }

    fn remove(&self, id: SessionId) -> bool {
        let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&id).is_some()
    }

    /// Cancel every tracked session. Returns how many were open.
    pub fn close_all(&self) -> usize {
        let sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut closed = 0;
        for entry in sessions.values() {
            if entry.state == SessionState::Open {
                closed += 1;
            }
            entry.cancel.cancel();
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: *id,
                peer: entry.peer,
                state: entry.state,
            })
            .collect()
    }
}

/// Why a session loop ended.
#[derive(Debug)]
enum Exit {
    PeerClosed,
    Cancelled,
    Transport(std::io::Error),
    Frame(FrameError),
    Undecodable(String),
}

/// Serve one connection until the peer leaves, an unrecoverable error occurs,
/// or the session is cancelled.
pub async fn handle_session(
    stream: TcpStream,
    peer: SocketAddr,
    id: SessionId,
    cancel: CancellationToken,
    ctx: ServerContext,
) {
    let dispatcher = Dispatcher::new(ctx.registry.clone());

    let exit = tokio::select! {
        exit = serve(stream, peer, &dispatcher, &ctx) => exit,
        _ = cancel.cancelled() => Exit::Cancelled,
    };

    // The stream was moved into `serve` and is dropped (closed) by now.
    ctx.sessions.set_state(id, SessionState::Closing);
    match &exit {
        Exit::PeerClosed => info!(peer = %peer, "Client disconnected"),
        Exit::Cancelled => info!(peer = %peer, "Client connection closed by server"),
        Exit::Transport(e) => warn!(peer = %peer, error = %e, "Client connection lost"),
        Exit::Frame(e) => warn!(peer = %peer, error = %e, "Closing client after framing error"),
        Exit::Undecodable(reason) => {
            warn!(peer = %peer, error = %reason, "Closing client after undecodable request")
        }
    }
    ctx.sessions.set_state(id, SessionState::Closed);
    ctx.sessions.remove(id);
}

async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: &Dispatcher,
    ctx: &ServerContext,
) -> Exit {
    let (reader, mut writer) = stream.into_split();
    let mut frames = FrameReader::new(BufReader::new(reader), ctx.config.max_frame_bytes);

    loop {
        let payload = match frames.read_frame().await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Exit::PeerClosed,
            Err(FrameError::Io(e)) => return Exit::Transport(e),
            Err(e) => return Exit::Frame(e),
        };

        let response = match decode_request(&payload) {
            Ok(request) => {
                ctx.clock.touch();
                debug!(peer = %peer, method = %request.method, id = %request.id, "Request received");
                dispatcher.handle(request)
            }
            Err(e) => match e.id {
                Some(id) => {
                    warn!(peer = %peer, error = %e.reason, "Invalid request");
                    ctx.clock.touch();
                    Response::error(id, &RpcError::Protocol(e.reason))
                }
                None => return Exit::Undecodable(e.reason),
            },
        };

        let encoded = match encode_response(&response) {
            Ok(encoded) => encoded,
            Err(e) => return Exit::Undecodable(format!("failed to encode response: {e}")),
        };
        if let Err(e) = write_frame(&mut writer, &encoded).await {
            return Exit::Transport(e);
        }
        debug!(peer = %peer, id = %response.id(), failed = response.is_error(), "Response sent");
    }
}
