pub mod transaction;
pub mod wallet;

pub use transaction::{NewTransaction, Transaction, TransactionStatus};
pub use wallet::Wallet;
