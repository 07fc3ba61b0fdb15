//! Wallet connection capability.
//!
//! A [`Wallet`] exposes the connected accounts and signs transactions. Two
//! implementations exist: [`InjectedWallet`] talks to a provider endpoint that
//! already holds unlocked accounts, [`RelayWallet`] negotiates a session with
//! a remote wallet through a relay bridge first. Which one is used is a
//! configuration choice ([`ConnectionKind`]).

mod injected;
mod relay;

pub use injected::InjectedWallet;
pub use relay::RelayWallet;

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::errors::SaleError;
use crate::evm::{EvmReader, EvmRpc, TransactionRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Injected,
    Relay,
}

impl ConnectionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionKind::Injected => "Metamask",
            ConnectionKind::Relay => "Trust Wallet",
        }
    }
}

#[async_trait]
pub trait Wallet: Send + Sync {
    fn kind(&self) -> ConnectionKind;

    async fn accounts(&self) -> Result<Vec<Address>, SaleError>;

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, SaleError>;

    /// Drop the connection. Handles obtained earlier are no longer valid.
    async fn disconnect(&self) -> Result<(), SaleError> {
        Ok(())
    }
}

/// An authenticated signer: the account transactions are sent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletHandle {
    pub kind: ConnectionKind,
    pub address: Address,
}

/// Bind a signer to the wallet's first account.
pub async fn get_signer(wallet: &dyn Wallet) -> Result<WalletHandle, SaleError> {
    let accounts = wallet.accounts().await?;
    let address = accounts.first().copied().ok_or_else(|| {
        SaleError::Connection(format!("{} exposed no accounts", wallet.kind().label()))
    })?;
    tracing::debug!(kind = ?wallet.kind(), %address, "signer bound");
    Ok(WalletHandle {
        kind: wallet.kind(),
        address,
    })
}

/// The wallet chosen by configuration plus the reader used for view calls
/// and receipts on the same chain.
#[derive(Clone)]
pub struct WalletContext {
    pub wallet: Arc<dyn Wallet>,
    pub reader: Arc<dyn EvmReader>,
}

pub fn connect(config: &AppConfig) -> Result<WalletContext, SaleError> {
    let timeout = config.request_timeout();
    match config.wallet_mode {
        ConnectionKind::Injected => {
            let url = config.injected_provider_url.clone();
            tracing::info!(provider = %url, "using injected wallet provider");
            Ok(WalletContext {
                wallet: Arc::new(InjectedWallet::new(url.clone(), timeout)),
                reader: Arc::new(EvmRpc::new(url, timeout)),
            })
        }
        ConnectionKind::Relay => {
            let relay_url = config.relay_url.clone().ok_or_else(|| {
                SaleError::Config("relay_url is required when wallet_mode = relay".to_string())
            })?;
            tracing::info!(relay = %relay_url, chain_id = config.chain_id, "using relay wallet");
            Ok(WalletContext {
                wallet: Arc::new(RelayWallet::new(
                    relay_url,
                    config.chain_id,
                    config.evm_rpc_url.clone(),
                    timeout,
                )),
                reader: Arc::new(EvmRpc::new(config.evm_rpc_url.clone(), timeout)),
            })
        }
    }
}
