//! Request and response envelopes.
//!
//! Every message is a single JSON object:
//!
//! ```text
//! request:  {"method": "floor", "params": [3.7], "id": 1}
//! success:  {"result": 3, "result_type": "int", "id": 1}
//! error:    {"error": "Method 'x' not found", "id": 1}
//! ```
//!
//! Framing (one object per line) lives in [`super::framing`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Correlation token echoed from a request into its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Text(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// A call from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Method name to invoke
    pub method: String,
    /// Positional parameters
    #[serde(default)]
    pub params: Vec<Value>,
    pub id: RequestId,
}

/// The server's answer to one request. Exactly one of the two forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success {
        result: Value,
        result_type: String,
        id: RequestId,
    },
    Failure {
        error: String,
        id: RequestId,
    },
}

/// Per-request failure taxonomy. `Display` is the message sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("Invalid request: {0}")]
    Protocol(String),
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
    #[error("Invalid arguments: {0}")]
    Argument(String),
    #[error("{0}")]
    Domain(String),
}

impl Response {
    /// Success response; `result_type` is derived from the value.
    pub fn success(id: RequestId, result: Value) -> Self {
        let result_type = result_type(&result).to_string();
        Self::Success {
            result,
            result_type,
            id,
        }
    }

    pub fn error(id: RequestId, error: &RpcError) -> Self {
        Self::Failure {
            error: error.to_string(),
            id,
        }
    }

    pub fn id(&self) -> &RequestId {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Semantic type tag of a result value.
pub fn result_type(value: &Value) -> &'static str {
    crate::functions::type_name(value)
}

/// A payload that could not be decoded into a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct DecodeError {
    /// Id salvaged from the payload, if it had a usable one
    pub id: Option<RequestId>,
    pub reason: String,
}

/// Decode one framed payload.
///
/// When decoding fails the id is still recovered if the payload is a JSON
/// object with an integer or string `id`, so the caller can answer it.
pub fn decode_request(payload: &str) -> Result<Request, DecodeError> {
    let value: Value = serde_json::from_str(payload).map_err(|e| DecodeError {
        id: None,
        reason: format!("malformed JSON: {e}"),
    })?;

    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

    serde_json::from_value::<Request>(value).map_err(|e| DecodeError {
        id,
        reason: e.to_string(),
    })
}

pub fn encode_request(request: &Request) -> serde_json::Result<String> {
    serde_json::to_string(request)
}

pub fn encode_response(response: &Response) -> serde_json::Result<String> {
    serde_json::to_string(response)
}

pub fn decode_response(payload: &str) -> serde_json::Result<Response> {
    serde_json::from_str(payload)
}
