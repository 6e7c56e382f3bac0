//! In-process store for development runs and tests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use solva_common::payment::{PaymentFact, Transaction, User};

use crate::store::{StoreError, TransactionLedger, UserDirectory};

/// Users by address and transactions by hash.
///
/// Hash uniqueness is decided under the map's shard lock, so two concurrent
/// inserts of the same hash cannot both succeed.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    transactions: DashMap<String, Transaction>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Onboard a user. Returns false if the address or username is taken.
    pub fn register_user(&self, address: &str, username: &str) -> bool {
        if self.users.iter().any(|u| u.username == username) {
            return false;
        }
        match self.users.entry(address.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(User {
                    address: address.to_string(),
                    username: username.to_string(),
                    created_at: Utc::now(),
                });
                true
            }
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn transaction(&self, hash: &str) -> Option<Transaction> {
        self.transactions.get(hash).map(|t| t.clone())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn user_by_address(&self, address: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(address).map(|u| u.clone()))
    }
}

#[async_trait]
impl TransactionLedger for MemoryStore {
    async fn record(
        &self,
        fact: &PaymentFact,
        sender_username: &str,
        receiver_username: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        match self.transactions.entry(fact.provider_tx_hash().to_string()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let tx = Transaction {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    sender_username: sender_username.to_string(),
                    receiver_username: receiver_username.to_string(),
                    amount: fact.amount(),
                    kind: fact.transaction_type(),
                    transaction_hash: fact.provider_tx_hash().to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(tx.clone());
                Ok(Some(tx))
            }
        }
    }

    async fn transactions_for(&self, username: &str) -> Result<Vec<Transaction>, StoreError> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.sender_username == username || t.receiver_username == username)
            .map(|t| t.clone())
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(txs)
    }
}
