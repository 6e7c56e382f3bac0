//! Helpers for driving the ingestion router in-process.
//!
//! Requests go through `tower::ServiceExt::oneshot`, so nothing binds a port.
//! Bodies are signed with the same schemes the providers use.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use solva_ingest::config::IngestConfig;
use solva_ingest::memory::MemoryStore;
use solva_ingest::pipeline::Ingestor;
use solva_ingest::provider::Provider;
use solva_ingest::routes::{self, AppState};
use tower::ServiceExt;

pub const CURVEGRID_SECRET: &str = "integration-curvegrid-secret";
pub const THIRDWEB_SECRET: &str = "integration-thirdweb-secret";

pub const MULTIBAAS_PATH: &str = "/curvegrid/internal-webhook";
pub const THIRDWEB_PATH: &str = "/thirdweb/webhook";

/// A router over a fresh in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    /// Onboards `users` as `(address, username)` pairs.
    pub fn new(users: &[(&str, &str)]) -> Self {
        tracing_subscriber::fmt::try_init().ok();

        let store = Arc::new(MemoryStore::new());
        for (address, username) in users {
            assert!(store.register_user(address, username), "duplicate test user {username}");
        }
        let state = Arc::new(AppState {
            ingestor: Ingestor::new(
                store.clone(),
                store.clone(),
                IngestConfig::with_secrets(CURVEGRID_SECRET, THIRDWEB_SECRET),
            ),
            multibaas: None,
            store_kind: "memory",
        });
        Self {
            store,
            router: routes::router(state),
        }
    }

    /// Send a request and return the status with the body parsed as JSON
    /// (`Value::Null` for an empty body).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Deliver `body` signed correctly and stamped now.
    pub async fn deliver(&self, provider: Provider, body: &[u8]) -> (StatusCode, Value) {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(provider, body, &timestamp);
        self.deliver_with(provider, body, Some(&timestamp), Some(&signature))
            .await
    }

    /// Deliver `body` with explicit (possibly absent) headers.
    pub async fn deliver_with(
        &self,
        provider: Provider,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> (StatusCode, Value) {
        let path = match provider {
            Provider::MultiBaas => MULTIBAAS_PATH,
            Provider::ThirdwebPay => THIRDWEB_PATH,
        };
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(ts) = timestamp {
            builder = builder.header(provider.timestamp_header(), ts);
        }
        if let Some(sig) = signature {
            builder = builder.header(provider.signature_header(), sig);
        }
        self.send(builder.body(Body::from(body.to_vec())).unwrap())
            .await
    }
}

pub fn secret(provider: Provider) -> &'static str {
    match provider {
        Provider::MultiBaas => CURVEGRID_SECRET,
        Provider::ThirdwebPay => THIRDWEB_SECRET,
    }
}

pub fn sign(provider: Provider, body: &[u8], timestamp: &str) -> String {
    provider
        .scheme()
        .sign(secret(provider).as_bytes(), body, timestamp)
        .unwrap()
}

/// A MultiBaas `event.emitted` payment event. `amount` is in USDC base units.
pub fn payment_event(sender: &str, receiver: &str, amount: &str, tx_hash: &str) -> Value {
    json!({
        "id": 1,
        "event": "event.emitted",
        "data": {
            "triggeredAt": "2025-04-05T17:30:57Z",
            "event": {
                "name": "PaymentCompleted",
                "signature": "PaymentCompleted(address,address,uint256)",
                "inputs": [
                    { "name": "sender", "value": sender, "hashed": false },
                    { "name": "receiver", "value": receiver, "hashed": false },
                    { "name": "amount", "value": amount, "hashed": false }
                ],
                "contract": { "address": "0xcontract", "name": "SolvaPayments" }
            },
            "transaction": {
                "txHash": tx_hash,
                "blockNumber": 42
            }
        }
    })
}

/// A thirdweb Pay fiat on-ramp status envelope. `cents` is USD cents.
pub fn fiat_onramp(status: &str, user: &str, wallet: &str, cents: i64, tx_hash: &str) -> Value {
    json!({
        "data": {
            "buyWithFiatStatus": {
                "intentId": "intent-1",
                "status": status,
                "toAddress": wallet,
                "source": {
                    "transactionHash": tx_hash,
                    "amountUSDCents": cents,
                    "completedAt": "2025-04-05T17:30:57Z"
                },
                "purchaseData": { "userAddress": user, "type": "topup" }
            }
        }
    })
}

pub fn to_body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}
