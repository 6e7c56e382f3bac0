use solva_common::event::RawEvent;
use solva_common::signature::SignatureScheme;

/// An upstream that pushes signed webhooks to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Curvegrid MultiBaas: batches of contract events.
    MultiBaas,
    /// thirdweb Pay: one status envelope per delivery.
    ThirdwebPay,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::MultiBaas => "multibaas",
            Provider::ThirdwebPay => "thirdweb",
        }
    }

    pub fn scheme(self) -> SignatureScheme {
        match self {
            Provider::MultiBaas => SignatureScheme::BodyThenTimestamp,
            Provider::ThirdwebPay => SignatureScheme::TimestampDotBody,
        }
    }

    pub fn signature_header(self) -> &'static str {
        match self {
            Provider::MultiBaas => "X-MultiBaas-Signature",
            Provider::ThirdwebPay => "X-Pay-Signature",
        }
    }

    pub fn timestamp_header(self) -> &'static str {
        match self {
            Provider::MultiBaas => "X-MultiBaas-Timestamp",
            Provider::ThirdwebPay => "X-Pay-Timestamp",
        }
    }

    /// Each provider only ever sends its own event family.
    pub fn emits(self, event: &RawEvent) -> bool {
        matches!(
            (self, event),
            (Provider::MultiBaas, RawEvent::OnChainTransfer(_))
                | (Provider::ThirdwebPay, RawEvent::OnRamp(_))
        )
    }
}
