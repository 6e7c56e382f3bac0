//! Provider payload shapes and their reduction to a [`PaymentFact`].
//!
//! Two families of events reach the pipeline:
//!
//! - **MultiBaas** contract-event deliveries: `{"data": {"event": {"name", "inputs": [..]},
//!   "transaction": {"txHash"}}}`. Inputs are a list of named arguments in
//!   arbitrary order; `sender`, `receiver` and `amount` (USDC base units) are
//!   picked out by exact name.
//! - **thirdweb Pay** status envelopes: `{"data": {"buyWithCryptoStatus": {..}}}`
//!   or `{"data": {"buyWithFiatStatus": {..}}}`, carrying a status string and
//!   amounts in USD cents. Only terminal-success statuses produce a fact.
//!
//! Shape detection happens once, up front, in [`RawEvent::from_value`]; each
//! variant then converts itself with its own pure function.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::payment::{
    scale_base_units, FactError, PaymentFact, SourceProvider, USDC_DECIMALS, USD_CENT_DECIMALS,
};

const CRYPTO_STATUS_KEY: &str = "buyWithCryptoStatus";
const FIAT_STATUS_KEY: &str = "buyWithFiatStatus";

/// Terminal success for a crypto swap.
pub const CRYPTO_COMPLETED: &str = "COMPLETED";
/// Terminal success for a fiat on-ramp.
pub const FIAT_COMPLETED: &str = "ON_RAMP_TRANSFER_COMPLETED";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("unrecognized event shape")]
    UnrecognizedShape,
    #[error("event does not match its declared shape: {0}")]
    Decode(String),
    #[error("required field `{0}` missing")]
    MissingField(&'static str),
    #[error("amount {0:?} is not an integer in base units")]
    InvalidAmount(String),
    #[error(transparent)]
    InvalidFact(#[from] FactError),
}

// ─── MultiBaas contract events ──────────────────────────────────────────────

/// One named argument of a decoded contract event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInput {
    pub name: String,
    pub value: Value,
}

impl EventInput {
    /// Addresses and amounts arrive as strings; tolerate bare JSON numbers.
    fn text(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    pub inputs: Vec<EventInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTransaction {
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainTransferData {
    pub event: ContractEvent,
    pub transaction: ChainTransaction,
}

/// A MultiBaas "event emitted" delivery item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainTransfer {
    pub data: OnChainTransferData,
}

impl OnChainTransfer {
    pub fn event_name(&self) -> &str {
        &self.data.event.name
    }

    pub fn normalize(&self) -> Result<PaymentFact, NormalizeError> {
        let mut sender = None;
        let mut receiver = None;
        let mut amount = None;

        // Later duplicates of a name win.
        for input in &self.data.event.inputs {
            match input.name.as_str() {
                "sender" => sender = input.text(),
                "receiver" => receiver = input.text(),
                "amount" => amount = Some(input),
                _ => {}
            }
        }

        let sender = sender.ok_or(NormalizeError::MissingField("sender"))?;
        let receiver = receiver.ok_or(NormalizeError::MissingField("receiver"))?;
        let amount = amount.ok_or(NormalizeError::MissingField("amount"))?;
        let amount = parse_base_units(amount, USDC_DECIMALS)?;

        Ok(PaymentFact::new(
            sender,
            receiver,
            amount,
            USDC_DECIMALS,
            self.data.transaction.tx_hash.clone(),
            SourceProvider::OnChainTransfer,
        )?)
    }
}

fn parse_base_units(input: &EventInput, decimals: u32) -> Result<Decimal, NormalizeError> {
    let text = input
        .text()
        .ok_or_else(|| NormalizeError::InvalidAmount(input.value.to_string()))?;
    let raw: i128 = text
        .trim()
        .parse()
        .map_err(|_| NormalizeError::InvalidAmount(text.clone()))?;
    scale_base_units(raw, decimals).ok_or(NormalizeError::InvalidAmount(text))
}

// ─── thirdweb Pay status envelopes ──────────────────────────────────────────

/// One leg (source or destination) of an on/off-ramp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RampLeg {
    pub transaction_hash: String,
    #[serde(rename = "amountUSDCents")]
    pub amount_usd_cents: i64,
    #[serde(default)]
    pub amount_wei: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl RampLeg {
    fn amount_usd(&self) -> Result<Decimal, NormalizeError> {
        scale_base_units(i128::from(self.amount_usd_cents), USD_CENT_DECIMALS)
            .ok_or_else(|| NormalizeError::InvalidAmount(self.amount_usd_cents.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseData {
    pub user_address: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoSwapStatus {
    #[serde(default)]
    pub swap_type: Option<String>,
    #[serde(default)]
    pub source: Option<RampLeg>,
    pub status: String,
    pub to_address: String,
    #[serde(default)]
    pub destination: Option<RampLeg>,
    pub purchase_data: PurchaseData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatOnRampStatus {
    pub source: RampLeg,
    pub status: String,
    pub to_address: String,
    pub purchase_data: PurchaseData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OnRampEvent {
    CryptoSwap(CryptoSwapStatus),
    FiatOnRamp(FiatOnRampStatus),
}

impl OnRampEvent {
    pub fn status(&self) -> &str {
        match self {
            OnRampEvent::CryptoSwap(s) => &s.status,
            OnRampEvent::FiatOnRamp(s) => &s.status,
        }
    }

    /// `Ok(None)` for any status other than the flow's terminal success.
    pub fn normalize(&self) -> Result<Option<PaymentFact>, NormalizeError> {
        let (leg, to_address, purchase, provider) = match self {
            OnRampEvent::CryptoSwap(s) => {
                if s.status != CRYPTO_COMPLETED {
                    return Ok(None);
                }
                let leg = s
                    .destination
                    .as_ref()
                    .ok_or(NormalizeError::MissingField("destination"))?;
                (leg, &s.to_address, &s.purchase_data, SourceProvider::CryptoSwap)
            }
            OnRampEvent::FiatOnRamp(s) => {
                if s.status != FIAT_COMPLETED {
                    return Ok(None);
                }
                (&s.source, &s.to_address, &s.purchase_data, SourceProvider::FiatOnRamp)
            }
        };

        let fact = PaymentFact::new(
            purchase.user_address.clone(),
            to_address.clone(),
            leg.amount_usd()?,
            USD_CENT_DECIMALS,
            leg.transaction_hash.clone(),
            provider,
        )?;
        Ok(Some(fact))
    }
}

// ─── Shape dispatch ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    OnChainTransfer(OnChainTransfer),
    OnRamp(OnRampEvent),
}

enum Shape {
    CryptoSwap,
    FiatOnRamp,
    OnChainTransfer,
}

impl RawEvent {
    /// Classify a free-form event object by the keys under `data`, then decode
    /// it strictly as that shape.
    ///
    /// A crypto status only wins over a fiat status when it carries a
    /// destination leg; otherwise the fiat status is used if present.
    pub fn from_value(mut value: Value) -> Result<Self, NormalizeError> {
        let shape = match value.get("data").and_then(Value::as_object) {
            Some(data) if has_destination(data) => Shape::CryptoSwap,
            Some(data) if data.contains_key(FIAT_STATUS_KEY) => Shape::FiatOnRamp,
            Some(data) if data.contains_key(CRYPTO_STATUS_KEY) => Shape::CryptoSwap,
            Some(data) if data.contains_key("event") && data.contains_key("transaction") => {
                Shape::OnChainTransfer
            }
            _ => return Err(NormalizeError::UnrecognizedShape),
        };

        match shape {
            Shape::CryptoSwap => Ok(RawEvent::OnRamp(OnRampEvent::CryptoSwap(decode(
                value["data"][CRYPTO_STATUS_KEY].take(),
            )?))),
            Shape::FiatOnRamp => Ok(RawEvent::OnRamp(OnRampEvent::FiatOnRamp(decode(
                value["data"][FIAT_STATUS_KEY].take(),
            )?))),
            Shape::OnChainTransfer => Ok(RawEvent::OnChainTransfer(decode(value)?)),
        }
    }

    /// Zero or one fact. `Ok(None)` means "recognized but not a completed payment".
    pub fn normalize(&self) -> Result<Option<PaymentFact>, NormalizeError> {
        match self {
            RawEvent::OnChainTransfer(event) => event.normalize().map(Some),
            RawEvent::OnRamp(event) => event.normalize(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RawEvent::OnChainTransfer(event) => format!("on-chain {}", event.event_name()),
            RawEvent::OnRamp(event) => format!("on-ramp status {}", event.status()),
        }
    }
}

fn has_destination(data: &Map<String, Value>) -> bool {
    data.get(CRYPTO_STATUS_KEY)
        .and_then(|status| status.get("destination"))
        .is_some_and(|leg| !leg.is_null())
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, NormalizeError> {
    serde_json::from_value(value).map_err(|e| NormalizeError::Decode(e.to_string()))
}
