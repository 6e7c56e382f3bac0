//! Ingestion orchestrator.
//!
//! A delivery passes two gates (signature, then timestamp) and is rejected as
//! a whole if either fails. Past the gates every event is processed on its
//! own: normalize, resolve both counterparties, record. One event's failure
//! only shows up in the [`BatchSummary`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use solva_common::event::{NormalizeError, RawEvent};
use solva_common::payment::{PaymentFact, Transaction, User};
use tracing::{debug, error, info, warn};

use crate::config::IngestConfig;
use crate::error::{EventError, Unauthenticated};
use crate::provider::Provider;
use crate::store::{StoreError, TransactionLedger, UserDirectory};

/// What happened to an event that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// A new ledger row.
    Recorded(Transaction),
    /// A recognized event that is not a completed payment.
    Ignored,
}

/// Per-delivery counters.
///
/// `processed` counts events that normalized into a payment; every processed
/// event ends up in exactly one of `created`, `duplicates`, `skipped` or `failed`.
/// Events that never normalized count only towards `skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub created: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn absorb(&mut self, outcome: &Result<EventOutcome, EventError>) {
        match outcome {
            Ok(EventOutcome::Recorded(_)) => {
                self.processed += 1;
                self.created += 1;
            }
            Ok(EventOutcome::Ignored) | Err(EventError::MalformedEvent(_)) => {
                self.skipped += 1;
            }
            Err(EventError::UnresolvedCounterparty(_)) => {
                self.processed += 1;
                self.skipped += 1;
            }
            Err(EventError::DuplicateTransaction(_)) => {
                self.processed += 1;
                self.duplicates += 1;
            }
            Err(EventError::Storage(_)) => {
                self.processed += 1;
                self.failed += 1;
            }
        }
    }

    pub fn into_response(self) -> BatchResponse {
        if self.processed > 0 {
            BatchResponse {
                status: "success",
                message: format!(
                    "Processed {} payment transactions, created {} p2p transactions",
                    self.processed, self.created
                ),
                summary: self,
            }
        } else {
            BatchResponse {
                status: "ignored",
                message: "No supported events found".to_string(),
                summary: self,
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub summary: BatchSummary,
}

pub struct Ingestor {
    directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn TransactionLedger>,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        ledger: Arc<dyn TransactionLedger>,
        config: IngestConfig,
    ) -> Self {
        Self {
            directory,
            ledger,
            config,
        }
    }

    fn secret(&self, provider: Provider) -> &[u8] {
        match provider {
            Provider::MultiBaas => self.config.curvegrid_secret.as_bytes(),
            Provider::ThirdwebPay => self.config.thirdweb_secret.as_bytes(),
        }
    }

    // ─── Gates ──────────────────────────────────────────────────────────────

    /// Run both delivery gates over the raw body. `now` is Unix seconds.
    pub fn authenticate(
        &self,
        provider: Provider,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now: i64,
    ) -> Result<(), Unauthenticated> {
        if let Err(e) = provider
            .scheme()
            .verify(self.secret(provider), body, timestamp, signature)
        {
            warn!(provider = provider.name(), reason = %e, "Rejected webhook delivery");
            return Err(Unauthenticated);
        }

        // verify() has already rejected a missing timestamp.
        let claimed = timestamp.unwrap_or_default();
        if let Err(e) = self.config.replay.check(claimed, now) {
            warn!(provider = provider.name(), reason = %e, now, "Rejected webhook delivery");
            return Err(Unauthenticated);
        }

        debug!(provider = provider.name(), timestamp = claimed, "Webhook delivery authenticated");
        Ok(())
    }

    // ─── Per-event steps ────────────────────────────────────────────────────

    /// Normalize, resolve and record one event. Never aborts a batch.
    pub async fn process_event(
        &self,
        provider: Provider,
        value: Value,
    ) -> Result<EventOutcome, EventError> {
        let event = RawEvent::from_value(value)?;
        if !provider.emits(&event) {
            return Err(NormalizeError::UnrecognizedShape.into());
        }

        let Some(fact) = event.normalize()? else {
            debug!(event = %event.describe(), "Ignoring non-completed event");
            return Ok(EventOutcome::Ignored);
        };
        info!(
            event = %event.describe(),
            tx_hash = fact.provider_tx_hash(),
            amount = %fact.amount(),
            "Normalized payment"
        );

        let (sender, receiver) = self.resolve(&fact).await?;
        self.record(&fact, &sender, &receiver).await
    }

    /// Both counterparties must be onboarded; lookups run concurrently.
    async fn resolve(&self, fact: &PaymentFact) -> Result<(User, User), EventError> {
        let (sender, receiver) = futures::try_join!(
            self.directory.user_by_address(fact.sender_address()),
            self.directory.user_by_address(fact.receiver_address()),
        )?;
        let sender =
            sender.ok_or_else(|| EventError::UnresolvedCounterparty(fact.sender_address().to_string()))?;
        let receiver = receiver
            .ok_or_else(|| EventError::UnresolvedCounterparty(fact.receiver_address().to_string()))?;
        Ok((sender, receiver))
    }

    async fn record(
        &self,
        fact: &PaymentFact,
        sender: &User,
        receiver: &User,
    ) -> Result<EventOutcome, EventError> {
        match self
            .ledger
            .record(fact, &sender.username, &receiver.username)
            .await?
        {
            Some(tx) => Ok(EventOutcome::Recorded(tx)),
            None => Err(EventError::DuplicateTransaction(
                fact.provider_tx_hash().to_string(),
            )),
        }
    }

    // ─── Deliveries ─────────────────────────────────────────────────────────

    /// Process an authenticated MultiBaas batch. Results keep input order.
    pub async fn ingest_batch(&self, events: Vec<Value>) -> BatchSummary {
        let total = events.len();
        let outcomes: Vec<Result<EventOutcome, EventError>> = stream::iter(events)
            .map(|value| self.process_event(Provider::MultiBaas, value))
            .buffered(self.config.event_concurrency)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for (index, outcome) in outcomes.iter().enumerate() {
            log_outcome(Provider::MultiBaas, index, outcome);
            summary.absorb(outcome);
        }
        info!(
            total,
            processed = summary.processed,
            created = summary.created,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            failed = summary.failed,
            "MultiBaas delivery processed"
        );
        summary
    }

    /// Process an authenticated thirdweb Pay envelope.
    pub async fn ingest_envelope(&self, value: Value) -> Result<EventOutcome, EventError> {
        let outcome = self.process_event(Provider::ThirdwebPay, value).await;
        log_outcome(Provider::ThirdwebPay, 0, &outcome);
        outcome
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    /// Transactions involving the user at `address`; empty for unknown addresses.
    pub async fn history(&self, address: &str) -> Result<Vec<Transaction>, StoreError> {
        match self.directory.user_by_address(address).await? {
            Some(user) => self.ledger.transactions_for(&user.username).await,
            None => {
                debug!(address, "History requested for unknown address");
                Ok(Vec::new())
            }
        }
    }
}

fn log_outcome(provider: Provider, index: usize, outcome: &Result<EventOutcome, EventError>) {
    let provider = provider.name();
    match outcome {
        Ok(EventOutcome::Recorded(tx)) => info!(
            provider,
            index,
            tx_hash = %tx.transaction_hash,
            kind = %tx.kind,
            "Recorded transaction"
        ),
        Ok(EventOutcome::Ignored) => {}
        Err(EventError::MalformedEvent(e)) => {
            info!(provider, index, reason = %e, "Skipping unsupported event")
        }
        Err(EventError::UnresolvedCounterparty(address)) => info!(
            provider,
            index,
            address = %address,
            "Skipping transaction, counterparty not onboarded"
        ),
        Err(EventError::DuplicateTransaction(hash)) => {
            info!(provider, index, tx_hash = %hash, "Transaction already recorded")
        }
        Err(EventError::Storage(e)) => {
            error!(provider, index, error = %e, "Failed to record transaction")
        }
    }
}
