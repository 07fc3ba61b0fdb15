use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::SaleError;

/// Failure of a single JSON-RPC round trip, before it is classified as a
/// query, transaction or connection error by the caller.
#[derive(Error, Debug)]
pub enum RpcFailure {
    #[error("RPC node timeout")]
    Timeout,

    #[error("RPC request failed: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl RpcFailure {
    pub fn into_query(self) -> SaleError {
        SaleError::Query(self.to_string())
    }

    pub fn into_transaction(self) -> SaleError {
        match self {
            Self::Node { code, message } => SaleError::rpc_transaction(code, message),
            other => SaleError::transaction(other.to_string()),
        }
    }

    pub fn into_connection(self) -> SaleError {
        SaleError::Connection(self.to_string())
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonRpcResponse<R> {
    Error { error: JsonRpcError },
    Success { result: R },
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    data: Option<serde_json::Value>,
}

/// Plain JSON-RPC 2.0 client over HTTP POST.
///
/// Used for the chain node, for an injected provider endpoint and for the
/// relay bridge; all three speak the same envelope.
pub struct JsonRpcClient {
    url: String,
    client: Client,
    request_timeout: Option<Duration>,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, request_timeout: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
            request_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, RpcFailure>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        tracing::debug!(method, url = %self.url, id = request.id, "JSON-RPC request");

        let send = self.client.post(&self.url).json(&request).send();
        let response = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| RpcFailure::Timeout)?,
            None => send.await,
        }
        .map_err(|e| {
            if e.is_timeout() {
                RpcFailure::Timeout
            } else {
                RpcFailure::Transport(format!("Network error: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(RpcFailure::Transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcFailure::Decode(e.to_string()))?;

        decode_response(body)
    }
}

fn decode_response<R>(body: JsonRpcResponse<R>) -> Result<R, RpcFailure> {
    match body {
        JsonRpcResponse::Error { error } => {
            tracing::error!(code = error.code, message = %error.message, "JSON-RPC error");
            Err(RpcFailure::Node {
                code: error.code,
                message: error.message,
            })
        }
        JsonRpcResponse::Success { result } => Ok(result),
    }
}

/// Parse a raw JSON-RPC response body. Shared with the WebSocket client,
/// which receives the same envelope as text frames.
pub(crate) fn parse_response<R: DeserializeOwned>(raw: &str) -> Result<R, RpcFailure> {
    let body: JsonRpcResponse<R> =
        serde_json::from_str(raw).map_err(|e| RpcFailure::Decode(e.to_string()))?;
    decode_response(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_result() {
        let value: String =
            parse_response(r#"{"jsonrpc":"2.0","id":1,"result":"0x01"}"#).unwrap();
        assert_eq!(value, "0x01");
    }

    #[test]
    fn parses_null_result_as_none() {
        let value: Option<String> =
            parse_response(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn parses_error_object() {
        let err = parse_response::<String>(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"insufficient funds"}}"#,
        )
        .unwrap_err();
        match err {
            RpcFailure::Node { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "insufficient funds");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn node_error_becomes_coded_transaction_error() {
        let err = RpcFailure::Node {
            code: 4001,
            message: "User rejected".into(),
        }
        .into_transaction();
        assert!(matches!(err, SaleError::Transaction { code: Some(4001), .. }));
    }

    #[test]
    fn garbage_is_decode_failure() {
        assert!(matches!(
            parse_response::<String>("not json"),
            Err(RpcFailure::Decode(_))
        ));
    }

    #[test]
    fn request_ids_increment() {
        let client = JsonRpcClient::new("http://localhost:8545", None);
        let a = client.next_id.fetch_add(1, Ordering::Relaxed);
        let b = client.next_id.fetch_add(1, Ordering::Relaxed);
        assert_eq!(b, a + 1);
        assert_eq!(client.url(), "http://localhost:8545");
    }
}
