//! Transaction domain entity.
//! An immutable-once-completed record of a balance movement between two
//! wallets, deduplicated by a caller-supplied idempotency key.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Ledger-entry lifecycle. `Completed` and `Reversed` are terminal for
/// reversal purposes; `Pending` and `Failed` are reserved and unused by
/// the current flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Reversed => "REVERSED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(TransactionStatus::Pending),
            "COMPLETED" => Some(TransactionStatus::Completed),
            "FAILED" => Some(TransactionStatus::Failed),
            "REVERSED" => Some(TransactionStatus::Reversed),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry for a completed transfer between two wallets.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub sender_wallet_id: Uuid,
    pub receiver_wallet_id: Uuid,
    #[schema(value_type = String, example = "100.50")]
    pub amount: BigDecimal,
    pub status: TransactionStatus,
    pub idempotency_key: String,
    /// Stamped when the transaction transitions to `Reversed`; also
    /// participates in idempotency-key dedup lookups.
    pub reversal_key: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new ledger row. The row is written with status
/// `Completed` inside the same atomic unit of work that moves the money.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub id: Uuid,
    pub sender_wallet_id: Uuid,
    pub receiver_wallet_id: Uuid,
    pub amount: BigDecimal,
    pub idempotency_key: String,
    pub description: Option<String>,
}

impl NewTransaction {
    pub fn new(
        sender_wallet_id: Uuid,
        receiver_wallet_id: Uuid,
        amount: BigDecimal,
        idempotency_key: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_wallet_id,
            receiver_wallet_id,
            amount,
            idempotency_key,
            description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Reversed,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(TransactionStatus::parse("SETTLED"), None);
        assert_eq!(TransactionStatus::parse("completed"), None);
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&TransactionStatus::Reversed).unwrap();
        assert_eq!(json, "\"REVERSED\"");
    }
}
