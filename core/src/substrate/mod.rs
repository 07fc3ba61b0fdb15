pub mod extrinsic;
pub mod keyring;
pub mod ws;

use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::address::{encode_ss58, parse_account};
use crate::config::{AppConfig, Secret};
use crate::errors::SaleError;
use extrinsic::{CallLayout, ChainState};
use keyring::{KeyScheme, Pair};
use ws::WsRpcClient;

/// Result of a submitted balances transfer on the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub extrinsic_hash: String,
    pub nonce: u64,
    pub signer: String,
    pub dest: String,
    pub amount: u128,
}

/// The cross-chain step: pay `amount` base units of the native token to
/// `dest` from the sale's transfer account.
#[async_trait]
pub trait TargetChain: Send + Sync {
    async fn transfer(&self, dest: &str, amount: u128) -> Result<TransferReceipt, SaleError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeVersion {
    spec_version: u32,
    transaction_version: u32,
}

/// [`TargetChain`] over a node's WebSocket JSON-RPC. Opens a fresh
/// connection per transfer.
pub struct SubstrateTransfer {
    ws_url: String,
    ss58_format: u16,
    mnemonic: Secret,
    scheme: KeyScheme,
    layout: CallLayout,
    request_timeout: Option<Duration>,
}

impl SubstrateTransfer {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ws_url: config.target_ws_url.clone(),
            ss58_format: config.target_ss58_format,
            mnemonic: config.transfer_mnemonic.clone(),
            scheme: config.key_scheme,
            layout: CallLayout {
                pallet_index: config.balances_pallet_index,
                call_index: config.transfer_call_index,
                metadata_hash_extension: config.metadata_hash_extension,
            },
            request_timeout: config.request_timeout(),
        }
    }

    fn signing_pair(&self) -> Result<Pair, SaleError> {
        if self.mnemonic.is_empty() {
            return Err(SaleError::Config(
                "transfer_mnemonic is not configured".to_string(),
            ));
        }
        Pair::from_mnemonic(self.mnemonic.expose(), self.scheme)
            .map_err(|e| SaleError::Config(e.to_string()))
    }

    async fn chain_state(client: &WsRpcClient) -> Result<ChainState, SaleError> {
        let genesis: B256 = client
            .request("chain_getBlockHash", json!([0]))
            .await
            .map_err(|e| e.into_transaction())?;
        let version: RuntimeVersion = client
            .request("state_getRuntimeVersion", json!([]))
            .await
            .map_err(|e| e.into_transaction())?;
        Ok(ChainState {
            genesis_hash: genesis.0,
            spec_version: version.spec_version,
            transaction_version: version.transaction_version,
        })
    }

    async fn submit(
        &self,
        client: &WsRpcClient,
        pair: &Pair,
        dest: &str,
        dest_account: [u8; 32],
        amount: u128,
    ) -> Result<TransferReceipt, SaleError> {
        let state = Self::chain_state(client).await?;
        let signer = pair.address(self.ss58_format);
        let nonce: u64 = client
            .request("system_accountNextIndex", json!([signer]))
            .await
            .map_err(|e| e.into_transaction())?;

        let xt = extrinsic::signed_transfer(pair, &self.layout, &state, nonce, dest_account, amount);
        let extrinsic_hash: String = client
            .request("author_submitExtrinsic", json!([format!("0x{}", hex::encode(&xt))]))
            .await
            .map_err(|e| e.into_transaction())?;

        tracing::info!(
            %extrinsic_hash,
            nonce,
            %signer,
            dest,
            amount = %amount,
            spec_version = state.spec_version,
            "transfer sent"
        );
        Ok(TransferReceipt {
            extrinsic_hash,
            nonce,
            signer,
            dest: dest.to_string(),
            amount,
        })
    }
}

#[async_trait]
impl TargetChain for SubstrateTransfer {
    async fn transfer(&self, dest: &str, amount: u128) -> Result<TransferReceipt, SaleError> {
        let dest_account = parse_account(dest)
            .map_err(|e| SaleError::validation(format!("invalid destination {dest}: {e}")))?;
        let pair = self.signing_pair()?;
        tracing::debug!(
            signer = %encode_ss58(&pair.public(), self.ss58_format),
            "transfer account derived"
        );

        let client = WsRpcClient::connect(&self.ws_url, self.request_timeout)
            .await
            .map_err(|e| e.into_transaction())?;
        let result = self.submit(&client, &pair, dest, dest_account, amount).await;
        client.close().await;
        result
    }
}
