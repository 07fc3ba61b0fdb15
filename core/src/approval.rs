use alloy_primitives::B256;

use crate::config::SaleContracts;
use crate::errors::SaleError;
use crate::evm::abi;
use crate::evm::receipt::wait_for_receipt;
use crate::evm::TransactionRequest;
use crate::flow::{FlowAction, FlowState, FlowTracker};
use crate::wallet::{get_signer, WalletContext};

/// Grant the sale contract the maximal allowance and wait for it to be
/// mined. The requested value does not depend on any purchase amount.
pub async fn approve(
    ctx: &WalletContext,
    contracts: &SaleContracts,
    tracker: &mut FlowTracker,
) -> Result<B256, SaleError> {
    let signer = get_signer(ctx.wallet.as_ref()).await?;
    let value = abi::max_approval(contracts.decimals)?;

    tracker.advance(FlowState::Submitting(FlowAction::Approve));
    let tx = TransactionRequest {
        from: signer.address,
        to: contracts.token,
        data: abi::encode_approve(contracts.sale, value),
    };
    let hash = ctx.wallet.send_transaction(tx).await?;
    tracing::info!(tx_hash = %hash, spender = %contracts.sale, %value, "approval submitted");

    tracker.advance(FlowState::AwaitingConfirmation);
    let receipt = wait_for_receipt(ctx.reader.as_ref(), hash, contracts.poll_interval).await?;
    if !receipt.succeeded() {
        return Err(SaleError::transaction(format!("approval {hash} reverted")));
    }

    tracker.advance(FlowState::Success);
    Ok(hash)
}
