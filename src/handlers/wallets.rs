//! Wallet endpoints: provisioning, deposits, and the caller's balance.

use axum::{extract::State, http::StatusCode, Json};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::Wallet;
use crate::error::LedgerError;
use crate::middleware::auth::AuthenticatedUser;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepositRequest {
    #[schema(value_type = String, example = "50.00")]
    pub amount: BigDecimal,
}

#[utoipa::path(
    post,
    path = "/wallets",
    responses(
        (status = 201, description = "Wallet created", body = Wallet),
        (status = 409, description = "Caller already has a wallet")
    ),
    tag = "Wallets"
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<Wallet>), LedgerError> {
    let wallet = state.ledger.create_wallet(user.0).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

#[utoipa::path(
    get,
    path = "/wallets/me",
    responses(
        (status = 200, description = "Caller's wallet", body = Wallet),
        (status = 404, description = "Caller has no wallet")
    ),
    tag = "Wallets"
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Wallet>, LedgerError> {
    let wallet = state.ledger.get_wallet(user.0).await?;
    Ok(Json(wallet))
}

#[utoipa::path(
    post,
    path = "/wallets/deposits",
    request_body = DepositRequest,
    responses(
        (status = 200, description = "Deposit applied"),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Caller has no wallet")
    ),
    tag = "Wallets"
)]
pub async fn deposit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<DepositRequest>,
) -> Result<StatusCode, LedgerError> {
    state.ledger.deposit(user.0, body.amount).await?;
    Ok(StatusCode::OK)
}
