use std::time::Duration;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde_json::json;

use super::{ConnectionKind, Wallet};
use crate::errors::SaleError;
use crate::evm::rpc::JsonRpcClient;
use crate::evm::TransactionRequest;

/// Wallet whose accounts are already unlocked at a JSON-RPC provider
/// endpoint (a local signer, Frame, a dev node).
pub struct InjectedWallet {
    rpc: JsonRpcClient,
}

impl InjectedWallet {
    pub fn new(provider_url: impl Into<String>, request_timeout: Option<Duration>) -> Self {
        Self {
            rpc: JsonRpcClient::new(provider_url, request_timeout),
        }
    }
}

#[async_trait]
impl Wallet for InjectedWallet {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Injected
    }

    async fn accounts(&self) -> Result<Vec<Address>, SaleError> {
        self.rpc
            .request("eth_accounts", json!([]))
            .await
            .map_err(|e| e.into_connection())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, SaleError> {
        let hash: B256 = self
            .rpc
            .request("eth_sendTransaction", json!([&tx]))
            .await
            .map_err(|e| e.into_transaction())?;
        tracing::info!(tx_hash = %hash, from = %tx.from, to = %tx.to, "transaction submitted");
        Ok(hash)
    }
}
