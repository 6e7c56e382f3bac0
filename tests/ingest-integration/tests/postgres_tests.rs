#![cfg(feature = "postgres-tests")]

//! Ledger tests against a live PostgreSQL.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -p solva-ingest-integration
//! --features postgres-tests`. Ledger rows cannot be deleted, so every test
//! works under names unique to its run.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use solva_common::payment::{PaymentFact, SourceProvider, TransactionType, USDC_DECIMALS};
use solva_ingest::postgres::PgStore;
use solva_ingest::store::{TransactionLedger, UserDirectory};

async fn store() -> PgStore {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a scratch database");
    let store = PgStore::connect(&url, 8).unwrap();
    store.migrate().await.unwrap();
    store
}

fn unique(tag: &str) -> String {
    format!("{tag}-{}", Utc::now().timestamp_nanos_opt().unwrap())
}

fn fact(sender: &str, receiver: &str, hash: &str) -> PaymentFact {
    PaymentFact::new(
        sender.to_string(),
        receiver.to_string(),
        Decimal::new(1_500_000, USDC_DECIMALS),
        USDC_DECIMALS,
        hash.to_string(),
        SourceProvider::OnChainTransfer,
    )
    .unwrap()
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let store = store().await;
    store.migrate().await.unwrap();
}

#[tokio::test]
async fn test_user_lookup() {
    let store = store().await;
    let address = unique("0xaddr");
    let username = unique("user");

    assert!(store.insert_user(&address, &username).await.unwrap());
    assert!(!store.insert_user(&address, &unique("other")).await.unwrap());

    let user = store.user_by_address(&address).await.unwrap().unwrap();
    assert_eq!(user.username, username);
    assert!(store.user_by_address(&unique("0xnone")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_record_is_idempotent_on_hash() {
    let store = store().await;
    let (a_addr, a_name) = (unique("0xa"), unique("alice"));
    let (b_addr, b_name) = (unique("0xb"), unique("bob"));
    store.insert_user(&a_addr, &a_name).await.unwrap();
    store.insert_user(&b_addr, &b_name).await.unwrap();

    let hash = unique("0xtx");
    let fact = fact(&a_addr, &b_addr, &hash);

    let tx = store.record(&fact, &a_name, &b_name).await.unwrap().unwrap();
    assert_eq!(tx.amount, Decimal::new(15, 1));
    assert_eq!(tx.kind, TransactionType::P2p);
    assert_eq!(tx.transaction_hash, hash);

    assert!(store.record(&fact, &a_name, &b_name).await.unwrap().is_none());

    let history = store.transactions_for(&b_name).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], tx);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_insert_once() {
    let store = Arc::new(store().await);
    let (a_addr, a_name) = (unique("0xa"), unique("alice"));
    let (b_addr, b_name) = (unique("0xb"), unique("bob"));
    store.insert_user(&a_addr, &a_name).await.unwrap();
    store.insert_user(&b_addr, &b_name).await.unwrap();

    let fact = Arc::new(fact(&a_addr, &b_addr, &unique("0xrace")));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let fact = fact.clone();
        let (a, b) = (a_name.clone(), b_name.clone());
        handles.push(tokio::spawn(async move {
            store.record(&fact, &a, &b).await.unwrap()
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.transactions_for(&a_name).await.unwrap().len(), 1);
}
