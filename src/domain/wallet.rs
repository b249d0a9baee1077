//! Wallet domain entity.
//! A per-user monetary balance record; one wallet per owner.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A user's wallet. The balance stays non-negative under normal flows;
/// the reversal path is the one sanctioned exception (receiver debit
/// without a sufficiency check).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[schema(value_type = String, example = "100.50")]
    pub balance: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Fresh wallet for `owner_id` with a zero balance.
    pub fn new(owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            balance: BigDecimal::from(0),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wallet_starts_empty() {
        let owner = Uuid::new_v4();
        let wallet = Wallet::new(owner);

        assert_eq!(wallet.owner_id, owner);
        assert_eq!(wallet.balance, BigDecimal::from(0));
    }
}
