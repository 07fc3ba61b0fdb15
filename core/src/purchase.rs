use alloy_primitives::{B256, U256};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::address::is_valid_target_address;
use crate::config::SaleContracts;
use crate::errors::SaleError;
use crate::evm::abi;
use crate::evm::receipt::wait_for_receipt;
use crate::evm::TransactionRequest;
use crate::flow::{FlowAction, FlowState, FlowTracker};
use crate::substrate::{TargetChain, TransferReceipt};
use crate::wallet::{get_signer, WalletContext};

pub const FILL_THE_FORM: &str = "Please fill the form";
pub const INVALID_TARGET_ADDRESS: &str = "selendra address is not valid!";
/// Decimals of the target chain's native token.
pub const TARGET_DECIMALS: u8 = 18;

/// Raw purchase input as the buyer typed it.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    /// Stablecoin amount in whole tokens, e.g. `"100"` or `"12.5"`.
    pub amount: String,
    /// Target-chain address that receives the native tokens.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub address: String,
    /// `amount` in token base units, sent to the sale contract.
    pub scaled_amount: U256,
    /// Same quantity in target-chain base units (18 decimals).
    pub transfer_amount: u128,
}

impl PurchaseRequest {
    pub fn new(amount: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            address: address.into(),
        }
    }

    pub fn validate(&self, decimals: u8) -> Result<ValidatedOrder, SaleError> {
        let amount = self.amount.trim();
        let address = self.address.trim();
        if amount.is_empty() || address.is_empty() {
            return Err(SaleError::validation(FILL_THE_FORM));
        }
        if !is_valid_target_address(address) {
            return Err(SaleError::validation(INVALID_TARGET_ADDRESS));
        }

        let scaled_amount = abi::scale_units(amount, decimals)?;
        if scaled_amount.is_zero() {
            return Err(SaleError::validation("Amount must be positive"));
        }
        let transfer_amount = abi::scale_units(amount, TARGET_DECIMALS)
            .and_then(|units| {
                u128::try_from(units).map_err(|_| SaleError::validation("Amount is too large"))
            })?;

        Ok(ValidatedOrder {
            address: address.to_string(),
            scaled_amount,
            transfer_amount,
        })
    }
}

/// Validate, place the order, and pay out on the target chain once the
/// order's receipt reports success. A failed transfer is not compensated.
pub async fn handle_order(
    ctx: &WalletContext,
    contracts: &SaleContracts,
    target: &dyn TargetChain,
    request: &PurchaseRequest,
    tracker: &mut FlowTracker,
) -> Result<(B256, TransferReceipt), SaleError> {
    tracker.advance(FlowState::Validating);
    let order = request.validate(contracts.decimals)?;
    let signer = get_signer(ctx.wallet.as_ref()).await?;

    tracker.advance(FlowState::Submitting(FlowAction::Order));
    let tx = TransactionRequest {
        from: signer.address,
        to: contracts.sale,
        data: abi::encode_order(&order.address, order.scaled_amount),
    };
    let hash = ctx.wallet.send_transaction(tx).await?;
    tracing::info!(tx_hash = %hash, dest = %order.address, amount = %order.scaled_amount, "order submitted");

    tracker.advance(FlowState::AwaitingConfirmation);
    let receipt = wait_for_receipt(ctx.reader.as_ref(), hash, contracts.poll_interval).await?;
    if !receipt.succeeded() {
        tracing::warn!(tx_hash = %hash, status = ?receipt.status, "order failed, no transfer sent");
        return Err(SaleError::transaction(format!("order {hash} reverted")));
    }

    tracker.advance(FlowState::Success);
    tracker.advance(FlowState::CrossChainTransfer);
    let transfer = target
        .transfer(&order.address, order.transfer_amount)
        .await
        .map_err(|e| {
            tracing::error!(tx_hash = %hash, dest = %order.address, error = %e, "order paid but transfer failed");
            e
        })?;
    Ok((hash, transfer))
}
