//! Postgres adapter tests. These require a running Postgres instance and are
//! ignored by default; run with:
//!
//!   DATABASE_URL=postgres://... cargo test -- --ignored

use bigdecimal::BigDecimal;
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use ledger_core::adapters::postgres::{PgTransactionStore, PgUnitOfWork, PgWalletStore};
use ledger_core::domain::TransactionStatus;
use ledger_core::services::transfers::{CreateTransfer, RevertTransaction};
use ledger_core::services::TransferService;

async fn setup_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    let migrator = Migrator::new(Path::new("./migrations"))
        .await
        .expect("Failed to load migrations");
    migrator
        .run(&pool)
        .await
        .expect("Failed to run migrations on test DB");
    pool
}

fn service(pool: PgPool) -> TransferService {
    TransferService::new(
        Arc::new(PgWalletStore::new(pool.clone())),
        Arc::new(PgTransactionStore::new(pool.clone())),
        Arc::new(PgUnitOfWork::new(pool)),
    )
}

#[tokio::test]
#[ignore] // requires Postgres
async fn transfer_commits_all_three_mutations() {
    let pool = setup_pool().await;
    let service = service(pool);

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    service.create_wallet(sender).await.unwrap();
    service.create_wallet(receiver).await.unwrap();
    service.deposit(sender, BigDecimal::from(1000)).await.unwrap();

    let id = service
        .create_transfer(CreateTransfer {
            sender_user_id: sender,
            receiver_user_id: receiver,
            amount: BigDecimal::from(100),
            idempotency_key: Uuid::new_v4().to_string(),
            description: None,
        })
        .await
        .unwrap();

    let tx = service.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(
        service.get_wallet(sender).await.unwrap().balance,
        BigDecimal::from(900)
    );
    assert_eq!(
        service.get_wallet(receiver).await.unwrap().balance,
        BigDecimal::from(100)
    );
}

#[tokio::test]
#[ignore] // requires Postgres
async fn reversal_round_trips_balances() {
    let pool = setup_pool().await;
    let service = service(pool);

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    service.create_wallet(sender).await.unwrap();
    service.create_wallet(receiver).await.unwrap();
    service.deposit(sender, BigDecimal::from(500)).await.unwrap();

    let id = service
        .create_transfer(CreateTransfer {
            sender_user_id: sender,
            receiver_user_id: receiver,
            amount: BigDecimal::from(200),
            idempotency_key: Uuid::new_v4().to_string(),
            description: Some("integration".to_string()),
        })
        .await
        .unwrap();

    service
        .revert_transaction(RevertTransaction {
            transaction_id: id,
            user_id: sender,
            idempotency_key: Uuid::new_v4().to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        service.get_wallet(sender).await.unwrap().balance,
        BigDecimal::from(500)
    );
    assert_eq!(
        service.get_wallet(receiver).await.unwrap().balance,
        BigDecimal::from(0)
    );
    let tx = service.get_transaction(id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Reversed);
}

#[tokio::test]
#[ignore] // requires Postgres
async fn duplicate_idempotency_key_replays_at_the_database_layer() {
    let pool = setup_pool().await;
    let service = service(pool);

    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    service.create_wallet(sender).await.unwrap();
    service.create_wallet(receiver).await.unwrap();
    service.deposit(sender, BigDecimal::from(100)).await.unwrap();

    let key = Uuid::new_v4().to_string();
    let request = CreateTransfer {
        sender_user_id: sender,
        receiver_user_id: receiver,
        amount: BigDecimal::from(50),
        idempotency_key: key,
        description: None,
    };

    let first = service.create_transfer(request.clone()).await.unwrap();
    let second = service.create_transfer(request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        service.get_wallet(sender).await.unwrap().balance,
        BigDecimal::from(50)
    );
}
