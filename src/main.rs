use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_core::adapters::postgres::{PgTransactionStore, PgUnitOfWork, PgWalletStore};
use ledger_core::services::TransferService;
use ledger_core::{config, create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    // Wire the orchestrator against the Postgres adapters
    let ledger = TransferService::new(
        Arc::new(PgWalletStore::new(pool.clone())),
        Arc::new(PgTransactionStore::new(pool.clone())),
        Arc::new(PgUnitOfWork::new(pool.clone())),
    );

    let app = create_app(AppState { db: pool, ledger });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
