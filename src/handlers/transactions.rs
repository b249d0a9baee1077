//! Transfer endpoints. Thin bindings over the transfer orchestrator; the
//! caller identity arrives through the `x-user-id` header (see
//! `middleware::auth`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Transaction;
use crate::error::LedgerError;
use crate::middleware::auth::AuthenticatedUser;
use crate::services::transfers::{CreateTransfer, RevertTransaction};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub receiver_user_id: Uuid,
    #[schema(value_type = String, example = "100.50")]
    pub amount: BigDecimal,
    pub idempotency_key: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionCreated {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevertTransactionRequest {
    pub idempotency_key: String,
}

#[utoipa::path(
    post,
    path = "/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transfer completed (or replayed by idempotency key)", body = TransactionCreated),
        (status = 400, description = "Invalid amount or self-transfer"),
        (status = 404, description = "Sender or receiver wallet not found")
    ),
    tag = "Transactions"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionCreated>), LedgerError> {
    let id = state
        .ledger
        .create_transfer(CreateTransfer {
            sender_user_id: user.0,
            receiver_user_id: body.receiver_user_id,
            amount: body.amount,
            idempotency_key: body.idempotency_key,
            description: body.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

#[utoipa::path(
    get,
    path = "/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction found", body = Transaction),
        (status = 404, description = "Transaction not found")
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, LedgerError> {
    let transaction = state.ledger.get_transaction(id).await?;
    Ok(Json(transaction))
}

#[utoipa::path(
    post,
    path = "/transactions/{id}/revert",
    params(("id" = Uuid, Path, description = "Transaction id")),
    request_body = RevertTransactionRequest,
    responses(
        (status = 200, description = "Transaction reverted"),
        (status = 403, description = "Caller is not the original sender"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Already reverted or idempotency key conflict")
    ),
    tag = "Transactions"
)]
pub async fn revert_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RevertTransactionRequest>,
) -> Result<StatusCode, LedgerError> {
    state
        .ledger
        .revert_transaction(RevertTransaction {
            transaction_id: id,
            user_id: user.0,
            idempotency_key: body.idempotency_key,
        })
        .await?;

    Ok(StatusCode::OK)
}
