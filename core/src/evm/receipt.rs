use std::time::Duration;

use alloy_primitives::{B256, U64};
use serde::{Deserialize, Serialize};

use crate::errors::SaleError;
use crate::evm::EvmReader;

/// A mined transaction as reported by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    /// `1` on success, `0` on revert. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub block_number: Option<U64>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == Some(U64::from(1))
    }
}

/// Poll until `hash` has a receipt. Waits indefinitely, like the wallet
/// libraries' `wait()`; the caller decides what a failed status means.
pub async fn wait_for_receipt(
    reader: &dyn EvmReader,
    hash: B256,
    poll_interval: Duration,
) -> Result<TransactionReceipt, SaleError> {
    let mut attempts: u64 = 0;
    loop {
        if let Some(receipt) = reader.transaction_receipt(hash).await? {
            tracing::info!(
                tx_hash = %hash,
                status = ?receipt.status,
                block = ?receipt.block_number,
                attempts,
                "transaction mined"
            );
            return Ok(receipt);
        }
        attempts += 1;
        tracing::debug!(tx_hash = %hash, attempts, "receipt not available yet");
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChain;

    #[test]
    fn deserializes_rpc_shape() {
        let json = r#"{
            "transactionHash": "0x8f1f8a7a4a0b8e0e6c6f8f1f8a7a4a0b8e0e6c6f8f1f8a7a4a0b8e0e6c6f8f1f",
            "status": "0x1",
            "blockNumber": "0x1b4",
            "gasUsed": "0x5208"
        }"#;
        let receipt: TransactionReceipt = serde_json::from_str(json).unwrap();
        assert!(receipt.succeeded());
        assert_eq!(receipt.block_number, Some(U64::from(0x1b4)));
    }

    #[test]
    fn zero_status_is_failure() {
        let receipt = TransactionReceipt {
            transaction_hash: B256::ZERO,
            status: Some(U64::ZERO),
            block_number: None,
        };
        assert!(!receipt.succeeded());
    }

    #[test]
    fn missing_status_is_not_success() {
        let receipt = TransactionReceipt {
            transaction_hash: B256::ZERO,
            status: None,
            block_number: None,
        };
        assert!(!receipt.succeeded());
    }

    #[tokio::test]
    async fn waits_until_receipt_appears() {
        let chain = FakeChain::new();
        let hash = B256::repeat_byte(7);
        chain.mine_after(hash, 2, true);
        let receipt = wait_for_receipt(&chain, hash, Duration::from_millis(1))
            .await
            .unwrap();
        assert!(receipt.succeeded());
        assert_eq!(chain.receipt_polls(), 3);
    }
}
