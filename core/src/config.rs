use std::fmt;
use std::time::Duration;

use alloy_primitives::Address;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::errors::SaleError;
use crate::substrate::keyring::KeyScheme;
use crate::wallet::ConnectionKind;

/// How the session decides that the sale contract may spend tokens after an
/// approval has been mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTracking {
    /// A mined approval hash counts as "approved" without reading the chain.
    TxHash,
    /// Read `allowance` again once the approval is mined.
    Requery,
}

/// Secret string whose `Debug` output never shows the value.
#[derive(Clone, Deserialize, Default)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Secret(<unset>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

/// Contract addresses and receipt polling shared by the on-chain actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleContracts {
    pub token: Address,
    pub sale: Address,
    pub decimals: u8,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub rust_log: String,

    // ── EVM side ──────────────────────────────────────────────────────────
    pub chain_id: u64,
    pub evm_rpc_url: String,
    pub injected_provider_url: String,
    pub wallet_mode: ConnectionKind,
    #[serde(default)]
    pub relay_url: Option<String>,
    pub token_address: Address,
    pub sale_contract_address: Address,
    pub token_decimals: u8,
    pub approval_tracking: ApprovalTracking,
    pub receipt_poll_interval_ms: u64,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    // ── Target chain ──────────────────────────────────────────────────────
    pub target_ws_url: String,
    pub target_ss58_format: u16,
    #[serde(default)]
    pub transfer_mnemonic: Secret,
    pub key_scheme: KeyScheme,
    pub balances_pallet_index: u8,
    pub transfer_call_index: u8,
    pub metadata_hash_extension: bool,

    pub sel_price_usdt: f64,
}

impl AppConfig {
    pub fn contracts(&self) -> SaleContracts {
        SaleContracts {
            token: self.token_address,
            sale: self.sale_contract_address,
            decimals: self.token_decimals,
            poll_interval: self.receipt_poll_interval(),
        }
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Reject combinations that would only fail later, mid-flow.
    pub fn validate(&self) -> Result<(), SaleError> {
        if !crate::validate_url(&self.evm_rpc_url) {
            return Err(SaleError::Config(format!(
                "invalid evm_rpc_url: {}",
                self.evm_rpc_url
            )));
        }
        if self.wallet_mode == ConnectionKind::Relay {
            match &self.relay_url {
                Some(url) if crate::validate_url(url) => {}
                Some(url) => {
                    return Err(SaleError::Config(format!("invalid relay_url: {url}")));
                }
                None => {
                    return Err(SaleError::Config(
                        "relay_url is required when wallet_mode = relay".to_string(),
                    ));
                }
            }
        } else if !crate::validate_url(&self.injected_provider_url) {
            return Err(SaleError::Config(format!(
                "invalid injected_provider_url: {}",
                self.injected_provider_url
            )));
        }
        if !(self.target_ws_url.starts_with("ws://") || self.target_ws_url.starts_with("wss://")) {
            return Err(SaleError::Config(format!(
                "target_ws_url must be a ws:// or wss:// URL: {}",
                self.target_ws_url
            )));
        }
        if self.sel_price_usdt <= 0.0 {
            return Err(SaleError::Config("sel_price_usdt must be positive".to_string()));
        }
        Ok(())
    }
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server_port", 8080)?
        .set_default("rust_log", "info")?
        .set_default("chain_id", 56)?
        .set_default("evm_rpc_url", "https://bsc-dataseed.binance.org")?
        .set_default("injected_provider_url", "http://127.0.0.1:1248")?
        .set_default("wallet_mode", "injected")?
        .set_default("token_address", "0x337610d27c682e347c9cd60bd4b3b107c9d34ddd")?
        .set_default(
            "sale_contract_address",
            "0x1ea5d1c9434B89B03C4aAC95dd4C56cD86430385",
        )?
        .set_default("token_decimals", 18)?
        .set_default("approval_tracking", "tx_hash")?
        .set_default("receipt_poll_interval_ms", 1500)?
        .set_default("target_ws_url", "wss://rpc1-testnet.selendra.org")?
        .set_default("target_ss58_format", 972)?
        .set_default("key_scheme", "sr25519")?
        .set_default("balances_pallet_index", 5)?
        .set_default("transfer_call_index", 0)?
        .set_default("metadata_hash_extension", false)?
        .set_default("sel_price_usdt", 0.03)
}

/// Load configuration from `.env` (if present) and `SALE_*` environment
/// variables on top of the built-in defaults.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let settings = builder()?
        .add_source(Environment::with_prefix("SALE").try_parsing(true))
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    builder()
        .and_then(|b| b.build())
        .and_then(|c| c.try_deserialize())
        .unwrap()
}
