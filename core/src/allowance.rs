use alloy_primitives::{Address, B256, U256};
use serde::Serialize;

use crate::config::SaleContracts;
use crate::errors::SaleError;
use crate::evm::abi;
use crate::evm::EvmReader;
use crate::wallet::{get_signer, WalletContext};

/// What the session currently knows about the sale contract's allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AllowanceRecord {
    Unknown,
    /// Read from the token contract, in base units.
    Amount(U256),
    /// An approval with this hash was mined; the chain was not re-read.
    Approved(B256),
}

impl AllowanceRecord {
    pub fn permits_purchase(&self) -> bool {
        match self {
            AllowanceRecord::Unknown => false,
            AllowanceRecord::Amount(amount) => !amount.is_zero(),
            AllowanceRecord::Approved(_) => true,
        }
    }
}

/// Allowance the connected account has granted the sale contract on the
/// token.
pub async fn get_allowance(
    ctx: &WalletContext,
    contracts: &SaleContracts,
) -> Result<U256, SaleError> {
    let signer = get_signer(ctx.wallet.as_ref()).await?;
    read_allowance(ctx.reader.as_ref(), signer.address, contracts).await
}

pub async fn read_allowance(
    reader: &dyn EvmReader,
    owner: Address,
    contracts: &SaleContracts,
) -> Result<U256, SaleError> {
    let data = abi::encode_allowance(owner, contracts.sale);
    let raw = reader.call(contracts.token, data).await?;
    let allowance = abi::decode_allowance(&raw)?;
    tracing::info!(%owner, spender = %contracts.sale, %allowance, "allowance read");
    Ok(allowance)
}
