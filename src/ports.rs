//! Store and unit-of-work contracts consumed by the transfer orchestrator.
//!
//! Mutations that must be atomic live exclusively on [`AtomicTx`], the
//! transaction object handed out by [`UnitOfWork::begin`]. A mutation cannot
//! be issued outside an atomic scope because no other type exposes one, so
//! the "forgot to pass the transaction context" class of bug is unrepresentable.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, Wallet};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {0}")]
    ConstraintViolation(String),

    /// The guarded debit predicate did not match: the wallet's balance was
    /// below the requested amount at execution time.
    #[error("balance below requested debit amount")]
    InsufficientBalance,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::ConstraintViolation(db_err.message().to_string());
            }
        }
        StoreError::Storage(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which way a balance adjustment moves money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Credit,
    Debit,
}

/// Wallet reads plus the standalone mutations that do not participate in a
/// transfer (provisioning, deposits). No business validation happens here.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn find_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Wallet>>;

    async fn find_by_id(&self, wallet_id: Uuid) -> StoreResult<Option<Wallet>>;

    /// Creates a zero-balance wallet for `owner_id`. Fails with
    /// [`StoreError::ConstraintViolation`] when the owner already has one.
    async fn create(&self, owner_id: Uuid) -> StoreResult<Wallet>;

    /// Standalone atomic credit (single-statement increment). Fails with
    /// [`StoreError::NotFound`] when the owner has no wallet.
    async fn deposit(&self, owner_id: Uuid, amount: &BigDecimal) -> StoreResult<()>;
}

/// Ledger reads.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Transaction>>;

    /// Dedup lookup. Matches the creation key or the stamped reversal key,
    /// since idempotency keys are globally unique across both uses.
    async fn find_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Transaction>>;
}

/// Factory for atomic execution scopes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn AtomicTx>>;
}

/// One all-or-nothing unit of work. Every operation on this object commits
/// together on [`AtomicTx::commit`]; dropping the object without committing
/// rolls everything back.
///
/// Balance adjustments are storage-level atomic increments, never
/// read-modify-write in application code.
#[async_trait]
pub trait AtomicTx: Send {
    /// Conditional decrement: only applies when `balance >= amount`, else
    /// fails with [`StoreError::InsufficientBalance`]. The forward transfer
    /// uses this so that two concurrent transfers cannot both pass the
    /// balance check and over-draw the wallet.
    async fn debit_guarded(&mut self, owner_id: Uuid, amount: &BigDecimal) -> StoreResult<()>;

    /// Unconditional atomic increment/decrement. The reversal flow debits
    /// the receiver through this without a sufficiency check.
    async fn adjust_balance(
        &mut self,
        owner_id: Uuid,
        amount: &BigDecimal,
        direction: Direction,
    ) -> StoreResult<()>;

    /// Inserts the ledger row with status `COMPLETED`. Fails with
    /// [`StoreError::ConstraintViolation`] when the idempotency key lost a
    /// race to a concurrent identical request.
    async fn insert_transaction(&mut self, new_tx: &NewTransaction) -> StoreResult<Uuid>;

    /// Transitions the row to `REVERSED` and stamps the reversal key.
    /// Fails with [`StoreError::ConstraintViolation`] when the row is
    /// already reversed or the key is taken.
    async fn mark_reversed(&mut self, id: Uuid, reversal_key: &str) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_sqlx_errors_map_to_storage() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
