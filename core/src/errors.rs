use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::reporter::ErrorReporter;

/// Every failure the buy flow can produce.
///
/// `Validation` is local to the caller and never reaches a chain. The other
/// kinds end the current attempt and are surfaced through [`ErrorReporter`].
#[derive(Error, Debug)]
pub enum SaleError {
    #[error("{0}")]
    Validation(String),

    #[error("Wallet connection failed: {0}")]
    Connection(String),

    #[error("Transaction failed: {message}")]
    Transaction { code: Option<i64>, message: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SaleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            code: None,
            message: message.into(),
        }
    }

    /// Attach a JSON-RPC / EIP-1193 error code to a transaction failure.
    pub fn rpc_transaction(code: i64, message: impl Into<String>) -> Self {
        Self::Transaction {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Connection(_) | Self::Transaction { .. } | Self::Query(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Transaction { .. } => "TRANSACTION_ERROR",
            Self::Query(_) => "QUERY_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<reqwest::Error> for SaleError {
    fn from(e: reqwest::Error) -> Self {
        Self::Query(format!("Network error: {e}"))
    }
}

impl From<serde_json::Error> for SaleError {
    fn from(e: serde_json::Error) -> Self {
        Self::Query(format!("Malformed response: {e}"))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SaleError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transaction {
            code: None,
            message: format!("Target chain socket error: {e}"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for SaleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message: ErrorReporter::report(&self),
        });

        (status, body).into_response()
    }
}
