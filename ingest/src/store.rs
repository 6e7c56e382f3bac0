//! Collaborator seams: the user directory and the transaction ledger.

use async_trait::async_trait;
use solva_common::payment::{PaymentFact, Transaction, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection pool: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("pool setup: {0}")]
    Build(#[from] deadpool_postgres::BuildError),
    #[error("postgres: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("{0}")]
    Unavailable(String),
}

/// Read-only view of onboarded users, keyed by wallet address.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_by_address(&self, address: &str) -> Result<Option<User>, StoreError>;

    async fn user_exists(&self, address: &str) -> Result<bool, StoreError> {
        Ok(self.user_by_address(address).await?.is_some())
    }
}

/// Append-only transaction store.
///
/// Implementations must enforce uniqueness of the provider transaction hash
/// in the storage layer itself; the pipeline never checks before inserting.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Insert a row for `fact`. `Ok(None)` when a row with the same hash exists.
    async fn record(
        &self,
        fact: &PaymentFact,
        sender_username: &str,
        receiver_username: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    /// All transactions sent or received by `username`, newest first.
    async fn transactions_for(&self, username: &str) -> Result<Vec<Transaction>, StoreError>;
}
