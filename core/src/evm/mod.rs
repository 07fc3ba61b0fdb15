pub mod abi;
pub mod receipt;
pub mod rpc;

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U64};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::errors::SaleError;
use receipt::TransactionReceipt;
use rpc::JsonRpcClient;

/// Transaction handed to the wallet for signing. Gas and nonce are left to
/// the wallet, as browser providers do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

/// Read side of the EVM client: network id, contract view calls and receipt
/// lookup.
#[async_trait]
pub trait EvmReader: Send + Sync {
    async fn chain_id(&self) -> Result<u64, SaleError>;

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, SaleError>;

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, SaleError>;
}

/// [`EvmReader`] backed by a JSON-RPC node.
pub struct EvmRpc {
    rpc: JsonRpcClient,
}

impl EvmRpc {
    pub fn new(url: impl Into<String>, request_timeout: Option<Duration>) -> Self {
        Self {
            rpc: JsonRpcClient::new(url, request_timeout),
        }
    }

    pub fn url(&self) -> &str {
        self.rpc.url()
    }
}

#[async_trait]
impl EvmReader for EvmRpc {
    async fn chain_id(&self) -> Result<u64, SaleError> {
        let id: U64 = self
            .rpc
            .request("eth_chainId", json!([]))
            .await
            .map_err(|e| e.into_query())?;
        Ok(id.to::<u64>())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, SaleError> {
        self.rpc
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
            .map_err(|e| e.into_query())
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, SaleError> {
        self.rpc
            .request("eth_getTransactionReceipt", json!([hash]))
            .await
            .map_err(|e| e.into_query())
    }
}
