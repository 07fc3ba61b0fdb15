use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::evm::rpc::{parse_response, RpcFailure};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-RPC 2.0 over a single WebSocket connection to a target chain node.
///
/// Requests are serialised through the socket lock; responses are matched
/// by id and unrelated frames (subscription notifications) are skipped.
pub struct WsRpcClient {
    url: String,
    stream: Mutex<WsStream>,
    next_id: AtomicU64,
    request_timeout: Option<Duration>,
}

impl WsRpcClient {
    pub async fn connect(url: &str, request_timeout: Option<Duration>) -> Result<Self, RpcFailure> {
        let connecting = connect_async(url);
        let (stream, _response) = match request_timeout {
            Some(limit) => tokio::time::timeout(limit, connecting)
                .await
                .map_err(|_| RpcFailure::Timeout)?,
            None => connecting.await,
        }
        .map_err(|e| RpcFailure::Transport(format!("WebSocket connect to {url} failed: {e}")))?;

        tracing::info!(url, "connected to target chain node");
        Ok(Self {
            url: url.to_string(),
            stream: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            request_timeout,
        })
    }

    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, RpcFailure>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let exchange = async {
            let mut stream = self.stream.lock().await;
            stream
                .send(Message::Text(body.to_string().into()))
                .await
                .map_err(|e| RpcFailure::Transport(format!("Send error: {e}")))?;
            tracing::debug!(method, id, "target chain request sent");

            while let Some(frame) = stream.next().await {
                let frame = frame.map_err(|e| RpcFailure::Transport(format!("Receive error: {e}")))?;
                match frame {
                    Message::Text(text) => {
                        if response_id(&text) == Some(id) {
                            return parse_response(&text);
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Err(RpcFailure::Transport(format!(
                "connection to {} closed before response to {method}",
                self.url
            )))
        };

        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| RpcFailure::Timeout)?,
            None => exchange.await,
        }
    }

    pub async fn close(&self) {
        let mut stream = self.stream.lock().await;
        if let Err(e) = stream.close(None).await {
            tracing::debug!(error = %e, "target chain socket close failed");
        }
    }
}

fn response_id(text: &str) -> Option<u64> {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("id").and_then(Value::as_u64))
}
