use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ports::StoreError;

/// Business-rule and storage failures surfaced by the transfer orchestrator.
/// Every variant is client-actionable except `Store`, which signals that the
/// caller should retry with the same idempotency key.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("sender and receiver wallets must differ")]
    InvalidTransfer,

    #[error("sender wallet not found")]
    SenderWalletNotFound,

    #[error("receiver wallet not found")]
    ReceiverWalletNotFound,

    #[error("wallet not found")]
    WalletNotFound,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("transaction already reverted")]
    AlreadyReverted,

    #[error("idempotency key already used for another transaction")]
    IdempotencyKeyConflict,

    #[error("only the original sender may revert a transaction")]
    Forbidden,

    #[error("wallet already exists for this user")]
    WalletAlreadyExists,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::InvalidAmount
            | LedgerError::InvalidTransfer
            | LedgerError::InsufficientBalance => StatusCode::BAD_REQUEST,
            LedgerError::SenderWalletNotFound
            | LedgerError::ReceiverWalletNotFound
            | LedgerError::WalletNotFound
            | LedgerError::TransactionNotFound => StatusCode::NOT_FOUND,
            LedgerError::AlreadyReverted
            | LedgerError::IdempotencyKeyConflict
            | LedgerError::WalletAlreadyExists => StatusCode::CONFLICT,
            LedgerError::Forbidden => StatusCode::FORBIDDEN,
            LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_amount_status_code() {
        assert_eq!(
            LedgerError::InvalidAmount.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_insufficient_balance_status_code() {
        assert_eq!(
            LedgerError::InsufficientBalance.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_found_status_codes() {
        assert_eq!(
            LedgerError::SenderWalletNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LedgerError::TransactionNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_status_codes() {
        assert_eq!(
            LedgerError::AlreadyReverted.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LedgerError::IdempotencyKeyConflict.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_forbidden_status_code() {
        assert_eq!(LedgerError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_store_error_status_code() {
        let error = LedgerError::Store(StoreError::Storage("connection reset".to_string()));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let response = LedgerError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
