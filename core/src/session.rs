use std::sync::Arc;

use alloy_primitives::B256;
use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::allowance::{get_allowance, AllowanceRecord};
use crate::approval;
use crate::config::{AppConfig, ApprovalTracking, SaleContracts};
use crate::errors::SaleError;
use crate::flow::{FlowAction, FlowOutcome, FlowTracker};
use crate::purchase::{self, PurchaseRequest};
use crate::substrate::{SubstrateTransfer, TargetChain};
use crate::wallet::{self, ConnectionKind, WalletContext};

/// Snapshot served to clients deciding which action to offer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionState {
    #[schema(value_type = String, example = "injected")]
    pub connection: ConnectionKind,
    #[schema(value_type = String, example = "Metamask")]
    pub wallet: &'static str,
    #[schema(value_type = Object)]
    pub allowance: AllowanceRecord,
    pub next_action: FlowAction,
}

/// One buyer's sale session: the configured wallet, the chains it acts on,
/// and the cached allowance record.
///
/// Actions are not serialised against each other; only the allowance record
/// is shared between them.
pub struct SaleSession {
    ctx: WalletContext,
    contracts: SaleContracts,
    target: Arc<dyn TargetChain>,
    tracking: ApprovalTracking,
    sel_price_usdt: f64,
    expected_chain: Option<u64>,
    allowance: RwLock<AllowanceRecord>,
}

impl SaleSession {
    pub fn new(
        ctx: WalletContext,
        contracts: SaleContracts,
        target: Arc<dyn TargetChain>,
        tracking: ApprovalTracking,
        sel_price_usdt: f64,
    ) -> Self {
        Self {
            ctx,
            contracts,
            target,
            tracking,
            sel_price_usdt,
            expected_chain: None,
            allowance: RwLock::new(AllowanceRecord::Unknown),
        }
    }

    /// Refuse to start unless the wallet's node reports `chain_id`.
    pub fn expecting_chain(mut self, chain_id: u64) -> Self {
        self.expected_chain = Some(chain_id);
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, SaleError> {
        let ctx = wallet::connect(config)?;
        let session = Self::new(
            ctx,
            config.contracts(),
            Arc::new(SubstrateTransfer::from_config(config)),
            config.approval_tracking,
            config.sel_price_usdt,
        );
        // relay sessions negotiate the chain during approval
        Ok(match config.wallet_mode {
            ConnectionKind::Injected => session.expecting_chain(config.chain_id),
            ConnectionKind::Relay => session,
        })
    }

    /// Check the network, then read the initial allowance. A failed
    /// allowance read is logged and leaves the record `Unknown`.
    pub async fn start(&self) -> Result<(), SaleError> {
        if let Some(expected) = self.expected_chain {
            let actual = self.ctx.reader.chain_id().await?;
            if actual != expected {
                return Err(SaleError::Connection(format!(
                    "wallet is on chain {actual}, expected {expected}"
                )));
            }
        }
        if let Err(e) = self.refresh_allowance().await {
            tracing::warn!(error = %e, "initial allowance check failed");
        }
        Ok(())
    }

    /// Close the wallet connection and forget the cached allowance.
    pub async fn disconnect(&self) -> Result<(), SaleError> {
        self.ctx.wallet.disconnect().await?;
        *self.allowance.write().await = AllowanceRecord::Unknown;
        tracing::info!("wallet disconnected");
        Ok(())
    }

    pub async fn refresh_allowance(&self) -> Result<AllowanceRecord, SaleError> {
        let amount = get_allowance(&self.ctx, &self.contracts).await?;
        let record = AllowanceRecord::Amount(amount);
        *self.allowance.write().await = record;
        Ok(record)
    }

    pub async fn allowance(&self) -> AllowanceRecord {
        *self.allowance.read().await
    }

    pub async fn next_action(&self) -> FlowAction {
        if self.allowance().await.permits_purchase() {
            FlowAction::Order
        } else {
            FlowAction::Approve
        }
    }

    pub async fn state(&self) -> SessionState {
        let kind = self.ctx.wallet.kind();
        SessionState {
            connection: kind,
            wallet: kind.label(),
            allowance: self.allowance().await,
            next_action: self.next_action().await,
        }
    }

    pub fn estimate(&self, amount: &str) -> Result<String, SaleError> {
        crate::estimate_sel_str(amount, self.sel_price_usdt)
    }

    pub async fn approve(&self) -> FlowOutcome {
        let mut tracker = FlowTracker::new(FlowAction::Approve);
        let result = approval::approve(&self.ctx, &self.contracts, &mut tracker).await;
        let result = match result {
            Ok(hash) => self.record_approval(hash).await.map(|()| (Some(hash), None)),
            Err(e) => Err(e),
        };
        let outcome = tracker.finish(result);
        if outcome.is_done() {
            tracing::info!("Approve completed!");
        }
        outcome
    }

    async fn record_approval(&self, hash: B256) -> Result<(), SaleError> {
        match self.tracking {
            ApprovalTracking::TxHash => {
                *self.allowance.write().await = AllowanceRecord::Approved(hash);
            }
            ApprovalTracking::Requery => {
                let record = self.refresh_allowance().await?;
                if !record.permits_purchase() {
                    tracing::warn!(tx_hash = %hash, "approval mined but allowance is still zero");
                }
            }
        }
        Ok(())
    }

    pub async fn handle_order(&self, request: &PurchaseRequest) -> FlowOutcome {
        let mut tracker = FlowTracker::new(FlowAction::Order);
        let result = purchase::handle_order(
            &self.ctx,
            &self.contracts,
            self.target.as_ref(),
            request,
            &mut tracker,
        )
        .await
        .map(|(hash, transfer)| (Some(hash), Some(transfer)));
        let outcome = tracker.finish(result);
        if outcome.is_done() {
            tracing::info!("Transaction completed!");
        }
        outcome
    }

    /// Message shown to the buyer for an outcome.
    pub fn message(outcome: &FlowOutcome) -> String {
        match (&outcome.error, outcome.action) {
            (Some(failure), _) => failure.message.clone(),
            (None, FlowAction::Approve) => "Approve completed!".to_string(),
            (None, FlowAction::Order) => "Transaction completed!".to_string(),
        }
    }
}
