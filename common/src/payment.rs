use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// USDC on-chain amounts are integers in 10^-6 units.
pub const USDC_DECIMALS: u32 = 6;

/// On-ramp amounts arrive as USD cents.
pub const USD_CENT_DECIMALS: u32 = 2;

/// Which upstream flow produced a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceProvider {
    /// thirdweb Pay crypto-to-crypto swap into a user wallet.
    CryptoSwap,
    /// thirdweb Pay fiat on-ramp into a user wallet.
    FiatOnRamp,
    /// MultiBaas-observed contract event between two wallets.
    OnChainTransfer,
}

impl SourceProvider {
    /// On-ramps fund a wallet, on-chain transfers move money between users.
    pub fn transaction_type(self) -> TransactionType {
        match self {
            SourceProvider::CryptoSwap | SourceProvider::FiatOnRamp => TransactionType::Topup,
            SourceProvider::OnChainTransfer => TransactionType::P2p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Topup,
    P2p,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Topup => "topup",
            TransactionType::P2p => "p2p",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topup" => Ok(TransactionType::Topup),
            "p2p" => Ok(TransactionType::P2p),
            other => Err(format!("unknown transaction type {other:?}")),
        }
    }
}

/// Why a set of extracted values cannot become a [`PaymentFact`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("provider transaction hash is empty")]
    EmptyTxHash,
    #[error("{0} address is empty")]
    EmptyAddress(&'static str),
}

/// Normalized, provider-agnostic description of one payment.
///
/// Only constructible through [`PaymentFact::new`], so every value in
/// circulation has a positive amount and a non-empty idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentFact {
    sender_address: String,
    receiver_address: String,
    amount: Decimal,
    currency_decimals: u32,
    provider_tx_hash: String,
    source_provider: SourceProvider,
}

impl PaymentFact {
    pub fn new(
        sender_address: String,
        receiver_address: String,
        amount: Decimal,
        currency_decimals: u32,
        provider_tx_hash: String,
        source_provider: SourceProvider,
    ) -> Result<Self, FactError> {
        if amount <= Decimal::ZERO {
            return Err(FactError::NonPositiveAmount(amount));
        }
        if provider_tx_hash.trim().is_empty() {
            return Err(FactError::EmptyTxHash);
        }
        if sender_address.trim().is_empty() {
            return Err(FactError::EmptyAddress("sender"));
        }
        if receiver_address.trim().is_empty() {
            return Err(FactError::EmptyAddress("receiver"));
        }
        Ok(Self {
            sender_address,
            receiver_address,
            amount,
            currency_decimals,
            provider_tx_hash,
            source_provider,
        })
    }

    pub fn sender_address(&self) -> &str {
        &self.sender_address
    }

    pub fn receiver_address(&self) -> &str {
        &self.receiver_address
    }

    /// Human-scale amount (already divided by `10^currency_decimals`).
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Decimal places the provider used for the base-unit amount.
    pub fn currency_decimals(&self) -> u32 {
        self.currency_decimals
    }

    /// Idempotency key for the ledger.
    pub fn provider_tx_hash(&self) -> &str {
        &self.provider_tx_hash
    }

    pub fn source_provider(&self) -> SourceProvider {
        self.source_provider
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.source_provider.transaction_type()
    }
}

/// Convert an integer amount in base units into a human-scale decimal.
///
/// Returns `None` when the value does not fit a 96-bit decimal mantissa.
pub fn scale_base_units(raw: i128, decimals: u32) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(raw, decimals)
        .ok()
        .map(|d| d.normalize())
}

/// An onboarded user. Owned by the user directory; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub address: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only ledger row. Counterparties are keyed by username, not address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub sender_username: String,
    pub receiver_username: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Provider transaction hash. Unique across the ledger.
    pub transaction_hash: String,
    pub created_at: DateTime<Utc>,
}
