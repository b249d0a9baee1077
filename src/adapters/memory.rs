//! In-memory implementation of the store and unit-of-work contracts.
//!
//! Backs the orchestrator's test suite and local experimentation. Atomicity
//! is provided by working on a snapshot of the shared state and swapping it
//! back in on commit under one lock; operations fail eagerly the way the
//! Postgres adapter does (key conflicts, missing wallets, guarded debits),
//! and a dropped transaction leaves the shared state untouched.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus, Wallet};
use crate::ports::{
    AtomicTx, Direction, StoreError, StoreResult, TransactionStore, UnitOfWork, WalletStore,
};

#[derive(Debug, Default, Clone)]
struct LedgerState {
    wallets: HashMap<Uuid, Wallet>,
    // owner_id -> wallet id
    owners: HashMap<Uuid, Uuid>,
    transactions: HashMap<Uuid, Transaction>,
    // creation and reversal keys -> transaction id
    keys: HashMap<String, Uuid>,
}

impl LedgerState {
    fn wallet_by_owner_mut(&mut self, owner_id: Uuid) -> StoreResult<&mut Wallet> {
        let wallet_id = *self
            .owners
            .get(&owner_id)
            .ok_or_else(|| StoreError::NotFound(format!("wallet for owner {owner_id}")))?;

        self.wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| StoreError::Storage(format!("owner index points at missing wallet {wallet_id}")))
    }
}

/// Shared in-memory ledger. Cloning shares the underlying state, so one
/// instance can serve as wallet store, transaction store, and unit of work
/// at the same time.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        // A poisoned lock means a test already panicked; propagating the
        // panic is the right outcome there.
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl WalletStore for InMemoryLedger {
    async fn find_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Wallet>> {
        let state = self.lock();
        Ok(state
            .owners
            .get(&owner_id)
            .and_then(|wallet_id| state.wallets.get(wallet_id))
            .cloned())
    }

    async fn find_by_id(&self, wallet_id: Uuid) -> StoreResult<Option<Wallet>> {
        Ok(self.lock().wallets.get(&wallet_id).cloned())
    }

    async fn create(&self, owner_id: Uuid) -> StoreResult<Wallet> {
        let mut state = self.lock();
        if state.owners.contains_key(&owner_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "wallet already exists for owner {owner_id}"
            )));
        }

        let wallet = Wallet::new(owner_id);
        state.owners.insert(owner_id, wallet.id);
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn deposit(&self, owner_id: Uuid, amount: &BigDecimal) -> StoreResult<()> {
        let mut state = self.lock();
        let wallet = state.wallet_by_owner_mut(owner_id)?;
        wallet.balance += amount.clone();
        wallet.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for InMemoryLedger {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        Ok(self.lock().transactions.get(&id).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Transaction>> {
        let state = self.lock();
        Ok(state
            .keys
            .get(key)
            .and_then(|id| state.transactions.get(id))
            .cloned())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryLedger {
    async fn begin(&self) -> StoreResult<Box<dyn AtomicTx>> {
        let working = self.lock().clone();
        Ok(Box::new(MemAtomicTx {
            shared: Arc::clone(&self.state),
            working,
        }))
    }
}

/// Snapshot-based transaction: operations mutate `working`; commit swaps it
/// into the shared state. Tests drive requests sequentially, so last-commit-
/// wins atomicity is sufficient here.
struct MemAtomicTx {
    shared: Arc<Mutex<LedgerState>>,
    working: LedgerState,
}

#[async_trait]
impl AtomicTx for MemAtomicTx {
    async fn debit_guarded(&mut self, owner_id: Uuid, amount: &BigDecimal) -> StoreResult<()> {
        let wallet = self.working.wallet_by_owner_mut(owner_id)?;
        if wallet.balance < *amount {
            return Err(StoreError::InsufficientBalance);
        }
        wallet.balance -= amount.clone();
        wallet.updated_at = Utc::now();
        Ok(())
    }

    async fn adjust_balance(
        &mut self,
        owner_id: Uuid,
        amount: &BigDecimal,
        direction: Direction,
    ) -> StoreResult<()> {
        let wallet = self.working.wallet_by_owner_mut(owner_id)?;
        match direction {
            Direction::Credit => wallet.balance += amount.clone(),
            Direction::Debit => wallet.balance -= amount.clone(),
        }
        wallet.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_transaction(&mut self, new_tx: &NewTransaction) -> StoreResult<Uuid> {
        if self.working.keys.contains_key(&new_tx.idempotency_key) {
            return Err(StoreError::ConstraintViolation(format!(
                "idempotency key '{}' already exists",
                new_tx.idempotency_key
            )));
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: new_tx.id,
            sender_wallet_id: new_tx.sender_wallet_id,
            receiver_wallet_id: new_tx.receiver_wallet_id,
            amount: new_tx.amount.clone(),
            status: TransactionStatus::Completed,
            idempotency_key: new_tx.idempotency_key.clone(),
            reversal_key: None,
            description: new_tx.description.clone(),
            created_at: now,
            completed_at: Some(now),
        };

        self.working
            .keys
            .insert(transaction.idempotency_key.clone(), transaction.id);
        self.working.transactions.insert(transaction.id, transaction);
        Ok(new_tx.id)
    }

    async fn mark_reversed(&mut self, id: Uuid, reversal_key: &str) -> StoreResult<()> {
        if self.working.keys.contains_key(reversal_key) {
            return Err(StoreError::ConstraintViolation(format!(
                "idempotency key '{reversal_key}' already exists"
            )));
        }

        let transaction = self
            .working
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))?;

        if transaction.status == TransactionStatus::Reversed {
            return Err(StoreError::ConstraintViolation(format!(
                "transaction {id} already reversed"
            )));
        }

        transaction.status = TransactionStatus::Reversed;
        transaction.reversal_key = Some(reversal_key.to_string());
        self.working.keys.insert(reversal_key.to_string(), id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        *self.shared.lock().unwrap() = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(value: i64) -> BigDecimal {
        BigDecimal::from(value)
    }

    #[tokio::test]
    async fn mutations_are_invisible_until_commit() {
        let ledger = InMemoryLedger::new();
        let owner = Uuid::new_v4();
        WalletStore::create(&ledger, owner).await.unwrap();
        ledger.deposit(owner, &amount(100)).await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        tx.debit_guarded(owner, &amount(40)).await.unwrap();

        let visible = ledger.find_by_owner(owner).await.unwrap().unwrap();
        assert_eq!(visible.balance, amount(100));

        tx.commit().await.unwrap();

        let visible = ledger.find_by_owner(owner).await.unwrap().unwrap();
        assert_eq!(visible.balance, amount(60));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let ledger = InMemoryLedger::new();
        let owner = Uuid::new_v4();
        WalletStore::create(&ledger, owner).await.unwrap();
        ledger.deposit(owner, &amount(100)).await.unwrap();

        {
            let mut tx = ledger.begin().await.unwrap();
            tx.debit_guarded(owner, &amount(40)).await.unwrap();
            // dropped without commit
        }

        let visible = ledger.find_by_owner(owner).await.unwrap().unwrap();
        assert_eq!(visible.balance, amount(100));
    }

    #[tokio::test]
    async fn guarded_debit_rejects_overdraw() {
        let ledger = InMemoryLedger::new();
        let owner = Uuid::new_v4();
        WalletStore::create(&ledger, owner).await.unwrap();
        ledger.deposit(owner, &amount(10)).await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        let err = tx.debit_guarded(owner, &amount(11)).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientBalance));
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_a_constraint_violation() {
        let ledger = InMemoryLedger::new();
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let sender_wallet = WalletStore::create(&ledger, sender).await.unwrap();
        let receiver_wallet = WalletStore::create(&ledger, receiver).await.unwrap();

        let new_tx = |key: &str| {
            NewTransaction::new(
                sender_wallet.id,
                receiver_wallet.id,
                amount(5),
                key.to_string(),
                None,
            )
        };

        let mut tx = ledger.begin().await.unwrap();
        tx.insert_transaction(&new_tx("K1")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        let err = tx.insert_transaction(&new_tx("K1")).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn duplicate_wallet_per_owner_is_rejected() {
        let ledger = InMemoryLedger::new();
        let owner = Uuid::new_v4();
        WalletStore::create(&ledger, owner).await.unwrap();

        let err = WalletStore::create(&ledger, owner).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }
}
