//! Postgres implementations of the store and unit-of-work contracts.
//!
//! Balance mutations are expressed as single-statement atomic increments
//! (`SET balance = balance +/- $n`); the storage engine's row locking inside
//! the transaction provides the isolation the orchestrator relies on.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus, Wallet};
use crate::ports::{
    AtomicTx, Direction, StoreError, StoreResult, TransactionStore, UnitOfWork, WalletStore,
};

/// Postgres-backed wallet store.
#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn find_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(row.map(WalletRow::into_domain))
    }

    async fn find_by_id(&self, wallet_id: Uuid) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE id = $1")
            .bind(wallet_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(row.map(WalletRow::into_domain))
    }

    async fn create(&self, owner_id: Uuid) -> StoreResult<Wallet> {
        let wallet = Wallet::new(owner_id);

        let row = sqlx::query_as::<_, WalletRow>(
            r#"
            INSERT INTO wallets (id, owner_id, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(wallet.id)
        .bind(wallet.owner_id)
        .bind(&wallet.balance)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.into_domain())
    }

    async fn deposit(&self, owner_id: Uuid, amount: &BigDecimal) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE wallets SET balance = balance + $2, updated_at = NOW() WHERE owner_id = $1",
        )
        .bind(owner_id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("wallet for owner {owner_id}")));
        }

        Ok(())
    }
}

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE idempotency_key = $1 OR reversal_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        row.map(TransactionRow::into_domain).transpose()
    }
}

/// Hands out sqlx transactions wrapped as [`AtomicTx`].
#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn begin(&self) -> StoreResult<Box<dyn AtomicTx>> {
        let tx = self.pool.begin().await.map_err(StoreError::from)?;
        Ok(Box::new(PgAtomicTx { tx }))
    }
}

/// One Postgres transaction. Dropping without commit rolls back (sqlx
/// issues the ROLLBACK on drop).
pub struct PgAtomicTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl AtomicTx for PgAtomicTx {
    async fn debit_guarded(&mut self, owner_id: Uuid, amount: &BigDecimal) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance - $2, updated_at = NOW()
            WHERE owner_id = $1 AND balance >= $2
            "#,
        )
        .bind(owner_id)
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from)?;

        // The orchestrator resolved the wallet before entering the atomic
        // block, so an unmatched row means the balance predicate failed.
        if result.rows_affected() == 0 {
            return Err(StoreError::InsufficientBalance);
        }

        Ok(())
    }

    async fn adjust_balance(
        &mut self,
        owner_id: Uuid,
        amount: &BigDecimal,
        direction: Direction,
    ) -> StoreResult<()> {
        let sql = match direction {
            Direction::Credit => {
                "UPDATE wallets SET balance = balance + $2, updated_at = NOW() WHERE owner_id = $1"
            }
            Direction::Debit => {
                "UPDATE wallets SET balance = balance - $2, updated_at = NOW() WHERE owner_id = $1"
            }
        };

        let result = sqlx::query(sql)
            .bind(owner_id)
            .bind(amount)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("wallet for owner {owner_id}")));
        }

        Ok(())
    }

    async fn insert_transaction(&mut self, new_tx: &NewTransaction) -> StoreResult<Uuid> {
        let id: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO transactions (
                id, sender_wallet_id, receiver_wallet_id, amount, status,
                idempotency_key, description, created_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(new_tx.id)
        .bind(new_tx.sender_wallet_id)
        .bind(new_tx.receiver_wallet_id)
        .bind(&new_tx.amount)
        .bind(TransactionStatus::Completed.as_str())
        .bind(&new_tx.idempotency_key)
        .bind(&new_tx.description)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::from)?;

        Ok(id.0)
    }

    async fn mark_reversed(&mut self, id: Uuid, reversal_key: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $3, reversal_key = $2
            WHERE id = $1 AND status <> $3
            "#,
        )
        .bind(id)
        .bind(reversal_key)
        .bind(TransactionStatus::Reversed.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from)?;

        // Zero rows means a concurrent reversal won the race.
        if result.rows_affected() == 0 {
            return Err(StoreError::ConstraintViolation(format!(
                "transaction {id} already reversed"
            )));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(StoreError::from)
    }
}

/// Internal row type for sqlx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    owner_id: Uuid,
    balance: BigDecimal,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl WalletRow {
    fn into_domain(self) -> Wallet {
        Wallet {
            id: self.id,
            owner_id: self.owner_id,
            balance: self.balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    sender_wallet_id: Uuid,
    receiver_wallet_id: Uuid,
    amount: BigDecimal,
    status: String,
    idempotency_key: String,
    reversal_key: Option<String>,
    description: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        let status = TransactionStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Storage(format!("unknown transaction status '{}'", self.status))
        })?;

        Ok(Transaction {
            id: self.id,
            sender_wallet_id: self.sender_wallet_id,
            receiver_wallet_id: self.receiver_wallet_id,
            amount: self.amount,
            status,
            idempotency_key: self.idempotency_key,
            reversal_key: self.reversal_key,
            description: self.description,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}
