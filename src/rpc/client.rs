//! RPC client.
//!
//! Keeps one connection open for its whole lifetime and correlates each
//! response with its request by id.

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, warn};

use super::framing::{DEFAULT_MAX_FRAME_BYTES, FrameError, FrameReader, write_frame};
use super::protocol::{Request, RequestId, Response, decode_response, encode_request};

/// Error returned by RPC client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to server: {0}")]
    Connect(std::io::Error),
    #[error("communication error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server closed the connection")]
    Disconnected,
    #[error("failed to serialize request: {0}")]
    Serialize(serde_json::Error),
    #[error("invalid response from server: {0}")]
    Parse(String),
}

impl From<FrameError> for ClientError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(e) => ClientError::Io(e),
            other => ClientError::Parse(other.to_string()),
        }
    }
}

/// Result of one call as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success { result: Value, result_type: String },
    Failure { message: String },
}

/// RPC client holding a single persistent connection.
pub struct RpcClient {
    reader: FrameReader<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_id: i64,
}

impl RpcClient {
    /// Connect to a server at `host:port`.
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(ClientError::Connect)?;
        debug!(addr = %address, "Connected to server");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: FrameReader::new(BufReader::new(reader), DEFAULT_MAX_FRAME_BYTES),
            writer,
            next_id: 0,
        })
    }

    /// Id that the next call will use.
    pub fn next_id(&self) -> i64 {
        self.next_id + 1
    }

    /// Call a method and wait for its response.
    pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<CallOutcome, ClientError> {
        self.next_id += 1;
        let id = RequestId::Number(self.next_id);
        let request = Request {
            method: method.to_string(),
            params,
            id: id.clone(),
        };

        let payload = encode_request(&request).map_err(ClientError::Serialize)?;
        write_frame(&mut self.writer, &payload).await?;

        loop {
            let frame = self
                .reader
                .read_frame()
                .await?
                .ok_or(ClientError::Disconnected)?;
            let response = decode_response(&frame).map_err(|e| ClientError::Parse(e.to_string()))?;

            if response.id() != &id {
                warn!(expected = %id, got = %response.id(), "Discarding response for another request");
                continue;
            }

            return Ok(match response {
                Response::Success {
                    result,
                    result_type,
                    ..
                } => CallOutcome::Success {
                    result,
                    result_type,
                },
                Response::Failure { error, .. } => CallOutcome::Failure { message: error },
            });
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
