use crate::errors::SaleError;

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 "unauthorized" (account not exposed to the dapp).
const UNAUTHORIZED_CODE: i64 = 4100;

const GENERIC_MESSAGE: &str = "Something went wrong, please try again";

/// Turns errors from the wallet and both chain clients into the short
/// strings shown to the buyer.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Map `error` to a user-facing message and log the raw error.
    pub fn report(error: &SaleError) -> String {
        let message = Self::classify(error);
        match error {
            SaleError::Validation(_) => tracing::debug!(%error, "validation rejected input"),
            _ => tracing::warn!(%error, user_message = %message, "buy flow step failed"),
        }
        message
    }

    fn classify(error: &SaleError) -> String {
        match error {
            SaleError::Validation(msg) => msg.clone(),
            SaleError::Connection(msg) => {
                if is_rejection(msg) {
                    "Connection request rejected".to_string()
                } else {
                    "Please connect your wallet".to_string()
                }
            }
            SaleError::Transaction { code, message } => match code {
                Some(USER_REJECTED_CODE) => "Transaction rejected by user".to_string(),
                Some(UNAUTHORIZED_CODE) => "Please connect your wallet".to_string(),
                _ if is_rejection(message) => "Transaction rejected by user".to_string(),
                _ if is_insufficient_funds(message) => {
                    "Insufficient funds for this transaction".to_string()
                }
                _ if message.to_lowercase().contains("insufficient allowance") => {
                    "Please approve USDT first".to_string()
                }
                _ if message.to_lowercase().contains("reverted") => {
                    "Transaction reverted on chain".to_string()
                }
                Some(code) if (-32099..=-32000).contains(code) || *code <= -32600 => {
                    format!("RPC error: {message}")
                }
                _ => GENERIC_MESSAGE.to_string(),
            },
            SaleError::Query(msg) => {
                if msg.to_lowercase().contains("rpc error") {
                    format!("Network error: {msg}")
                } else {
                    GENERIC_MESSAGE.to_string()
                }
            }
            SaleError::Config(_) => GENERIC_MESSAGE.to_string(),
        }
    }
}

fn is_rejection(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("user rejected") || lower.contains("user denied") || lower.contains("rejected by user")
}

fn is_insufficient_funds(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("insufficient funds") || lower.contains("insufficient balance")
}
