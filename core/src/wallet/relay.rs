use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use super::{ConnectionKind, Wallet};
use crate::errors::SaleError;
use crate::evm::rpc::JsonRpcClient;
use crate::evm::TransactionRequest;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    chain_id: u64,
    /// Chain id (decimal string) → RPC endpoint the remote wallet should use.
    rpc: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionApproval {
    topic: String,
    accounts: Vec<Address>,
    chain_id: u64,
}

#[derive(Debug, Serialize)]
struct SessionPayload<'a, P> {
    topic: &'a str,
    payload: WalletCall<'a, P>,
}

#[derive(Debug, Serialize)]
struct WalletCall<'a, P> {
    method: &'a str,
    params: P,
}

/// Wallet reached through a relay bridge. The session is negotiated lazily on
/// first use, which is when the remote wallet shows its connection prompt,
/// and lives until [`Wallet::disconnect`].
pub struct RelayWallet {
    rpc: JsonRpcClient,
    chain_id: u64,
    chain_rpc_url: String,
    session: Mutex<Option<SessionApproval>>,
}

impl RelayWallet {
    pub fn new(
        relay_url: impl Into<String>,
        chain_id: u64,
        chain_rpc_url: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            rpc: JsonRpcClient::new(relay_url, request_timeout),
            chain_id,
            chain_rpc_url: chain_rpc_url.into(),
            session: Mutex::new(None),
        }
    }

    fn session_request(&self) -> SessionRequest {
        let mut rpc = HashMap::new();
        rpc.insert(self.chain_id.to_string(), self.chain_rpc_url.clone());
        SessionRequest {
            chain_id: self.chain_id,
            rpc,
        }
    }

    async fn session(&self) -> Result<SessionApproval, SaleError> {
        let mut session = self.session.lock().await;
        if let Some(active) = session.as_ref() {
            return Ok(active.clone());
        }
        let approval = self.negotiate().await?;
        *session = Some(approval.clone());
        Ok(approval)
    }

    async fn negotiate(&self) -> Result<SessionApproval, SaleError> {
        tracing::info!(relay = %self.rpc.url(), chain_id = self.chain_id, "requesting wallet session");
        let approval: SessionApproval = self
            .rpc
            .request("wc_sessionRequest", json!([self.session_request()]))
            .await
            .map_err(|e| e.into_connection())?;
        check_approval(&approval, self.chain_id)?;
        tracing::info!(
            topic = %approval.topic,
            accounts = approval.accounts.len(),
            "wallet session approved"
        );
        Ok(approval)
    }
}

fn check_approval(approval: &SessionApproval, expected_chain: u64) -> Result<(), SaleError> {
    if approval.chain_id != expected_chain {
        return Err(SaleError::Connection(format!(
            "wallet is on chain {}, expected {}",
            approval.chain_id, expected_chain
        )));
    }
    if approval.accounts.is_empty() {
        return Err(SaleError::Connection(
            "wallet approved the session without accounts".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Wallet for RelayWallet {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Relay
    }

    async fn accounts(&self) -> Result<Vec<Address>, SaleError> {
        Ok(self.session().await?.accounts)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, SaleError> {
        let session = self.session().await?;
        let call = SessionPayload {
            topic: &session.topic,
            payload: WalletCall {
                method: "eth_sendTransaction",
                params: [&tx],
            },
        };
        let hash: B256 = self
            .rpc
            .request("wc_sessionPayload", json!([call]))
            .await
            .map_err(|e| e.into_transaction())?;
        tracing::info!(tx_hash = %hash, topic = %session.topic, "transaction submitted via relay");
        Ok(hash)
    }

    /// End the relay session. A later call negotiates a new one.
    async fn disconnect(&self) -> Result<(), SaleError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        self.rpc
            .request::<_, serde_json::Value>("wc_sessionKill", json!([{ "topic": session.topic }]))
            .await
            .map_err(|e| e.into_connection())?;
        tracing::info!(topic = %session.topic, "wallet session closed");
        Ok(())
    }
}
