//! PostgreSQL-backed directory and ledger.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use solva_common::payment::{PaymentFact, Transaction, User};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use tracing::info;

use crate::store::{StoreError, TransactionLedger, UserDirectory};

/// Idempotent schema bootstrap. `transactions` rejects UPDATE and DELETE.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    address     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS transactions (
    id                 BIGSERIAL PRIMARY KEY,
    sender_username    TEXT NOT NULL REFERENCES users (username),
    receiver_username  TEXT NOT NULL REFERENCES users (username),
    amount             NUMERIC NOT NULL CHECK (amount > 0),
    type               TEXT NOT NULL CHECK (type IN ('topup', 'p2p')),
    transaction_hash   TEXT NOT NULL UNIQUE,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS transactions_sender_idx ON transactions (sender_username);
CREATE INDEX IF NOT EXISTS transactions_receiver_idx ON transactions (receiver_username);

CREATE OR REPLACE FUNCTION transactions_append_only() RETURNS trigger AS $$
BEGIN
    RAISE EXCEPTION 'transactions are append-only';
END;
$$ LANGUAGE plpgsql;

CREATE OR REPLACE TRIGGER transactions_append_only
    BEFORE UPDATE OR DELETE ON transactions
    FOR EACH ROW EXECUTE FUNCTION transactions_append_only();
"#;

const TRANSACTION_COLUMNS: &str =
    "id, sender_username, receiver_username, amount, type, transaction_hash, created_at";

pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn connect(database_url: &str, max_size: usize) -> Result<Self, StoreError> {
        let pg_config: tokio_postgres::Config = database_url.parse()?;
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager).max_size(max_size).build()?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        info!("Database schema ready");
        Ok(())
    }

    /// Onboard a user. Returns false if the address or username is taken.
    pub async fn insert_user(&self, address: &str, username: &str) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let inserted = client
            .execute(
                "INSERT INTO users (address, username) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                &[&address, &username],
            )
            .await?;
        Ok(inserted == 1)
    }
}

fn user_from_row(row: &Row) -> Result<User, StoreError> {
    Ok(User {
        address: row.try_get("address")?,
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
    })
}

fn transaction_from_row(row: &Row) -> Result<Transaction, StoreError> {
    let kind: String = row.try_get("type")?;
    Ok(Transaction {
        id: row.try_get("id")?,
        sender_username: row.try_get("sender_username")?,
        receiver_username: row.try_get("receiver_username")?,
        amount: row.try_get("amount")?,
        kind: kind.parse().map_err(StoreError::Corrupt)?,
        transaction_hash: row.try_get("transaction_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn user_by_address(&self, address: &str) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT address, username, created_at FROM users WHERE address = $1",
                &[&address],
            )
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl TransactionLedger for PgStore {
    async fn record(
        &self,
        fact: &PaymentFact,
        sender_username: &str,
        receiver_username: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO transactions \
                 (sender_username, receiver_username, amount, type, transaction_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (transaction_hash) DO NOTHING \
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let result = client
            .query_opt(
                sql.as_str(),
                &[
                    &sender_username,
                    &receiver_username,
                    &fact.amount(),
                    &fact.transaction_type().as_str(),
                    &fact.provider_tx_hash(),
                ],
            )
            .await;

        match result {
            Ok(Some(row)) => transaction_from_row(&row).map(Some),
            Ok(None) => Ok(None),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn transactions_for(&self, username: &str) -> Result<Vec<Transaction>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE sender_username = $1 OR receiver_username = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = client.query(sql.as_str(), &[&username]).await?;
        rows.iter().map(transaction_from_row).collect()
    }
}
