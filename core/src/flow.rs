use alloy_primitives::B256;
use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::SaleError;
use crate::reporter::ErrorReporter;
use crate::substrate::TransferReceipt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    Approve,
    Order,
}

/// Per-attempt state of an approve or order action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Validating,
    Submitting(FlowAction),
    AwaitingConfirmation,
    Success,
    CrossChainTransfer,
    Done,
    Failed(String),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Done | FlowState::Failed(_))
    }

    fn can_advance_to(&self, next: &FlowState) -> bool {
        use FlowState::*;
        match (self, next) {
            (s, Failed(_)) => !s.is_terminal(),
            (Idle, Validating) | (Idle, Submitting(_)) | (Validating, Submitting(_)) => true,
            (Submitting(_), AwaitingConfirmation) | (AwaitingConfirmation, Success) => true,
            (Success, CrossChainTransfer) | (Success, Done) | (CrossChainTransfer, Done) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowFailure {
    pub kind: String,
    pub message: String,
    #[serde(skip)]
    pub status: StatusCode,
}

/// What one attempt ended with.
#[derive(Debug, Clone, Serialize)]
pub struct FlowOutcome {
    pub action: FlowAction,
    pub state: FlowState,
    pub history: Vec<FlowState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FlowFailure>,
}

impl FlowOutcome {
    pub fn is_done(&self) -> bool {
        self.state == FlowState::Done
    }
}

/// Records state transitions of one attempt.
#[derive(Debug)]
pub struct FlowTracker {
    action: FlowAction,
    history: Vec<FlowState>,
}

impl FlowTracker {
    pub fn new(action: FlowAction) -> Self {
        Self {
            action,
            history: vec![FlowState::Idle],
        }
    }

    pub fn current(&self) -> &FlowState {
        // history always starts with Idle
        &self.history[self.history.len() - 1]
    }

    pub fn advance(&mut self, next: FlowState) {
        if !self.current().can_advance_to(&next) {
            tracing::warn!(action = ?self.action, from = ?self.current(), to = ?next, "unexpected flow transition");
        }
        tracing::debug!(action = ?self.action, to = ?next, "flow state");
        self.history.push(next);
    }

    /// Close the attempt. Errors go through [`ErrorReporter`] and end in
    /// `Failed`; success ends in `Done`.
    pub fn finish(
        mut self,
        result: Result<(Option<B256>, Option<TransferReceipt>), SaleError>,
    ) -> FlowOutcome {
        match result {
            Ok((tx_hash, transfer)) => {
                if *self.current() != FlowState::Done {
                    self.advance(FlowState::Done);
                }
                FlowOutcome {
                    action: self.action,
                    state: FlowState::Done,
                    history: self.history,
                    tx_hash,
                    transfer,
                    error: None,
                }
            }
            Err(error) => {
                let message = ErrorReporter::report(&error);
                self.advance(FlowState::Failed(message.clone()));
                FlowOutcome {
                    action: self.action,
                    state: FlowState::Failed(message.clone()),
                    history: self.history,
                    tx_hash: None,
                    transfer: None,
                    error: Some(FlowFailure {
                        kind: error.kind().to_string(),
                        message,
                        status: error.status_code(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_order_path() {
        let mut t = FlowTracker::new(FlowAction::Order);
        for s in [
            FlowState::Validating,
            FlowState::Submitting(FlowAction::Order),
            FlowState::AwaitingConfirmation,
            FlowState::Success,
            FlowState::CrossChainTransfer,
        ] {
            assert!(t.current().can_advance_to(&s), "{:?} -> {:?}", t.current(), s);
            t.advance(s);
        }
        let outcome = t.finish(Ok((Some(B256::ZERO), None)));
        assert!(outcome.is_done());
        assert_eq!(outcome.history.len(), 7);
        assert_eq!(outcome.history[0], FlowState::Idle);
    }

    #[test]
    fn terminal_states_do_not_advance() {
        assert!(!FlowState::Done.can_advance_to(&FlowState::Failed("x".into())));
        assert!(!FlowState::Failed("x".into()).can_advance_to(&FlowState::Idle));
        assert!(!FlowState::Idle.can_advance_to(&FlowState::Success));
    }

    #[test]
    fn failure_is_reported() {
        let mut t = FlowTracker::new(FlowAction::Approve);
        t.advance(FlowState::Submitting(FlowAction::Approve));
        let outcome = t.finish(Err(SaleError::rpc_transaction(4001, "User denied")));
        assert_eq!(
            outcome.state,
            FlowState::Failed("Transaction rejected by user".into())
        );
        let failure = outcome.error.unwrap();
        assert_eq!(failure.kind, "TRANSACTION_ERROR");
        assert_eq!(failure.status, StatusCode::BAD_GATEWAY);
        assert!(outcome.tx_hash.is_none());
    }

    #[test]
    fn state_serializes_tagged() {
        let json = serde_json::to_value(FlowState::Submitting(FlowAction::Order)).unwrap();
        assert_eq!(json["state"], "submitting");
        assert_eq!(json["detail"], "order");
        let json = serde_json::to_value(FlowState::Done).unwrap();
        assert_eq!(json["state"], "done");
    }
}
