//! RPC method dispatch.
//!
//! Resolves a request's method in the registry, invokes it and turns the
//! outcome into a response. Every per-request failure ends up as an error
//! envelope here; nothing propagates to the session loop.

use std::sync::Arc;

use tracing::debug;

use crate::functions::{CallError, Registry};

use super::protocol::{Request, Response, RpcError};

/// Handles RPC method dispatch and execution.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Handle an RPC request and return a response.
    pub fn handle(&self, request: Request) -> Response {
        let Request { method, params, id } = request;

        match self.call(&method, &params) {
            Ok(result) => Response::success(id, result),
            Err(error) => {
                debug!(method = %method, %id, error = %error, "Request failed");
                Response::error(id, &error)
            }
        }
    }

    fn call(&self, method: &str, params: &[serde_json::Value]) -> Result<serde_json::Value, RpcError> {
        let function = self
            .registry
            .resolve(method)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))?;

        function.invoke(params).map_err(|e| match e {
            CallError::Argument(msg) => RpcError::Argument(msg),
            CallError::Domain(msg) => RpcError::Domain(msg),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::protocol::RequestId;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(Registry::builtin()))
    }

    fn request(method: &str, params: serde_json::Value, id: i64) -> Request {
        Request {
            method: method.to_string(),
            params: serde_json::from_value(params).unwrap(),
            id: RequestId::Number(id),
        }
    }

    #[test]
    fn test_valid_anagram_scenario() {
        let resp = dispatcher().handle(request("validAnagram", json!(["listen", "silent"]), 2));
        assert_eq!(resp, Response::success(RequestId::Number(2), json!(true)));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"result": true, "result_type": "bool", "id": 2})
        );
    }

    #[test]
    fn test_even_root_of_negative_is_error() {
        let resp = dispatcher().handle(request("nroot", json!([-8, 2]), 1));
        match resp {
            Response::Failure { error, id } => {
                assert_eq!(id, RequestId::Number(1));
                assert!(error.contains("even root"));
            }
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method() {
        let resp = dispatcher().handle(request("launch", json!([]), 9));
        let value = serde_json::to_value(&resp).unwrap();

        assert_eq!(value, json!({"error": "Method 'launch' not found", "id": 9}));
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_argument_errors_are_contained() {
        let d = dispatcher();

        let resp = d.handle(request("floor", json!(["3.5"]), 3));
        assert!(resp.is_error());

        let resp = d.handle(request("sort", json!([]), 4));
        assert!(resp.is_error());
        assert_eq!(resp.id(), &RequestId::Number(4));
    }

    #[test]
    fn test_results_carry_type_tags() {
        let d = dispatcher();

        let resp = d.handle(request("floor", json!([3.7]), 1));
        assert_eq!(resp, Response::success(RequestId::Number(1), json!(3)));
        assert_eq!(
            serde_json::to_value(&resp).unwrap()["result_type"],
            json!("int")
        );

        let resp = d.handle(request("sort", json!([["b", "a"]]), 2));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"result": ["a", "b"], "result_type": "list", "id": 2})
        );

        let resp = d.handle(request("nroot", json!([9, 2]), 3));
        assert_eq!(
            serde_json::to_value(&resp).unwrap()["result_type"],
            json!("float")
        );
    }
}
