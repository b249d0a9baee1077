pub mod adapters;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::services::TransferService;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub ledger: TransferService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::transactions::create_transaction,
        handlers::transactions::get_transaction,
        handlers::transactions::revert_transaction,
        handlers::wallets::create_wallet,
        handlers::wallets::get_wallet,
        handlers::wallets::deposit,
    ),
    components(schemas(
        handlers::HealthStatus,
        handlers::DbPoolStats,
        handlers::transactions::CreateTransactionRequest,
        handlers::transactions::TransactionCreated,
        handlers::transactions::RevertTransactionRequest,
        handlers::wallets::DepositRequest,
        domain::Transaction,
        domain::TransactionStatus,
        domain::Wallet,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/transactions",
            post(handlers::transactions::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::transactions::get_transaction),
        )
        .route(
            "/transactions/:id/revert",
            post(handlers::transactions::revert_transaction),
        )
        .route("/wallets", post(handlers::wallets::create_wallet))
        .route("/wallets/me", get(handlers::wallets::get_wallet))
        .route("/wallets/deposits", post(handlers::wallets::deposit))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
