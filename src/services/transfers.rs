//! Transfer orchestrator: the transfer/reversal state machine.
//!
//! Validates requests, resolves both wallets, and commits the money movement
//! through one atomic unit of work. All business invariants (idempotency
//! replay, balance sufficiency, reversal authorization) are decided here;
//! the stores only execute.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus, Wallet};
use crate::error::LedgerError;
use crate::ports::{Direction, StoreError, TransactionStore, UnitOfWork, WalletStore};

/// A transfer request. `sender_user_id` comes from the authenticated caller
/// identity and is trusted verbatim.
#[derive(Debug, Clone)]
pub struct CreateTransfer {
    pub sender_user_id: Uuid,
    pub receiver_user_id: Uuid,
    pub amount: BigDecimal,
    pub idempotency_key: String,
    pub description: Option<String>,
}

/// A reversal request for a previously completed transfer.
#[derive(Debug, Clone)]
pub struct RevertTransaction {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub idempotency_key: String,
}

/// Coordinates wallet and ledger mutations. Depends only on the store and
/// unit-of-work contracts; wiring happens at startup.
#[derive(Clone)]
pub struct TransferService {
    wallets: Arc<dyn WalletStore>,
    transactions: Arc<dyn TransactionStore>,
    uow: Arc<dyn UnitOfWork>,
}

impl TransferService {
    pub fn new(
        wallets: Arc<dyn WalletStore>,
        transactions: Arc<dyn TransactionStore>,
        uow: Arc<dyn UnitOfWork>,
    ) -> Self {
        Self {
            wallets,
            transactions,
            uow,
        }
    }

    /// Creates a transfer: debits the sender, writes the ledger row with
    /// status `COMPLETED`, credits the receiver, all in one atomic unit of
    /// work.
    ///
    /// The idempotency check runs before any business validation so a
    /// retried request replays the original result instead of being
    /// re-evaluated against a since-changed balance.
    pub async fn create_transfer(&self, request: CreateTransfer) -> Result<Uuid, LedgerError> {
        if let Some(existing) = self
            .transactions
            .find_by_idempotency_key(&request.idempotency_key)
            .await?
        {
            info!(
                transaction_id = %existing.id,
                idempotency_key = %request.idempotency_key,
                "transfer replayed by idempotency key"
            );
            return Ok(existing.id);
        }

        if request.amount <= BigDecimal::from(0) {
            return Err(LedgerError::InvalidAmount);
        }

        if request.sender_user_id == request.receiver_user_id {
            return Err(LedgerError::InvalidTransfer);
        }

        let sender = self
            .wallets
            .find_by_owner(request.sender_user_id)
            .await?
            .ok_or(LedgerError::SenderWalletNotFound)?;

        let receiver = self
            .wallets
            .find_by_owner(request.receiver_user_id)
            .await?
            .ok_or(LedgerError::ReceiverWalletNotFound)?;

        if sender.balance < request.amount {
            return Err(LedgerError::InsufficientBalance);
        }

        let new_tx = NewTransaction::new(
            sender.id,
            receiver.id,
            request.amount.clone(),
            request.idempotency_key.clone(),
            request.description.clone(),
        );

        let outcome = self.apply_transfer(&sender, &receiver, &new_tx).await;

        match outcome {
            Ok(id) => {
                info!(
                    transaction_id = %id,
                    sender_wallet = %sender.id,
                    receiver_wallet = %receiver.id,
                    "transfer completed"
                );
                Ok(id)
            }
            Err(StoreError::InsufficientBalance) => Err(LedgerError::InsufficientBalance),
            Err(StoreError::ConstraintViolation(_)) => {
                // A concurrent identical request won the insert race; its
                // row is the authoritative result.
                warn!(
                    idempotency_key = %request.idempotency_key,
                    "idempotency key lost insert race, replaying winner"
                );
                let existing = self
                    .transactions
                    .find_by_idempotency_key(&request.idempotency_key)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::Store(StoreError::Storage(
                            "idempotency key conflict but no row found on re-read".to_string(),
                        ))
                    })?;
                Ok(existing.id)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_transfer(
        &self,
        sender: &Wallet,
        receiver: &Wallet,
        new_tx: &NewTransaction,
    ) -> Result<Uuid, StoreError> {
        let mut tx = self.uow.begin().await?;
        let id = tx.insert_transaction(new_tx).await?;
        tx.debit_guarded(sender.owner_id, &new_tx.amount).await?;
        tx.adjust_balance(receiver.owner_id, &new_tx.amount, Direction::Credit)
            .await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Reverts a completed transfer: credits the sender back, debits the
    /// receiver, and transitions the row to `REVERSED`, atomically.
    ///
    /// Only the original sender may revert. The receiver is debited without
    /// a sufficiency check, mirroring the forward debit; if the funds were
    /// already spent the receiver's balance goes negative.
    pub async fn revert_transaction(&self, request: RevertTransaction) -> Result<(), LedgerError> {
        if let Some(existing) = self
            .transactions
            .find_by_idempotency_key(&request.idempotency_key)
            .await?
        {
            if existing.id != request.transaction_id {
                return Err(LedgerError::IdempotencyKeyConflict);
            }
            if existing.status == TransactionStatus::Reversed {
                return Err(LedgerError::AlreadyReverted);
            }
            // The key belongs to this transaction and no reversal has been
            // applied; treat the request as already satisfied.
            return Ok(());
        }

        let transaction = self
            .transactions
            .find_by_id(request.transaction_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound)?;

        if transaction.status == TransactionStatus::Reversed {
            return Err(LedgerError::AlreadyReverted);
        }

        let sender = self
            .wallets
            .find_by_id(transaction.sender_wallet_id)
            .await?
            .ok_or(LedgerError::SenderWalletNotFound)?;

        if sender.owner_id != request.user_id {
            return Err(LedgerError::Forbidden);
        }

        let receiver = self
            .wallets
            .find_by_id(transaction.receiver_wallet_id)
            .await?
            .ok_or(LedgerError::ReceiverWalletNotFound)?;

        let outcome = self
            .apply_reversal(&sender, &receiver, &transaction, &request.idempotency_key)
            .await;

        match outcome {
            Ok(()) => {
                info!(
                    transaction_id = %transaction.id,
                    reversal_key = %request.idempotency_key,
                    "transaction reverted"
                );
                Ok(())
            }
            // Losing the race on the status transition or the reversal key
            // means another reversal already applied.
            Err(StoreError::ConstraintViolation(_)) => Err(LedgerError::AlreadyReverted),
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_reversal(
        &self,
        sender: &Wallet,
        receiver: &Wallet,
        transaction: &Transaction,
        reversal_key: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.uow.begin().await?;
        tx.adjust_balance(sender.owner_id, &transaction.amount, Direction::Credit)
            .await?;
        tx.adjust_balance(receiver.owner_id, &transaction.amount, Direction::Debit)
            .await?;
        tx.mark_reversed(transaction.id, reversal_key).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<Transaction, LedgerError> {
        self.transactions
            .find_by_id(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound)
    }

    /// Standalone deposit into the caller's wallet.
    pub async fn deposit(&self, user_id: Uuid, amount: BigDecimal) -> Result<(), LedgerError> {
        if amount <= BigDecimal::from(0) {
            return Err(LedgerError::InvalidAmount);
        }

        match self.wallets.deposit(user_id, &amount).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(LedgerError::WalletNotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// Provisions a zero-balance wallet for a newly registered user.
    pub async fn create_wallet(&self, owner_id: Uuid) -> Result<Wallet, LedgerError> {
        match self.wallets.create(owner_id).await {
            Ok(wallet) => Ok(wallet),
            Err(StoreError::ConstraintViolation(_)) => Err(LedgerError::WalletAlreadyExists),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_wallet(&self, owner_id: Uuid) -> Result<Wallet, LedgerError> {
        self.wallets
            .find_by_owner(owner_id)
            .await?
            .ok_or(LedgerError::WalletNotFound)
    }
}
