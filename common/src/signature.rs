//! Webhook signature schemes.
//!
//! Both providers sign with HMAC-SHA256 and send a lowercase hex digest, but
//! they feed the MAC differently. Verification always runs over the raw body
//! bytes exactly as received, before any JSON parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// MultiBaas: the MAC absorbs the raw body, then the timestamp, as one stream.
    BodyThenTimestamp,
    /// thirdweb Pay: the MAC absorbs `"{timestamp}.{body}"` with the body as UTF-8 text.
    TimestampDotBody,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header missing")]
    MissingSignature,
    #[error("timestamp header missing")]
    MissingTimestamp,
    #[error("body is not valid UTF-8")]
    NonUtf8Body,
    #[error("invalid HMAC key")]
    InvalidKey,
    #[error("signature mismatch")]
    Mismatch,
}

impl SignatureScheme {
    /// Compute the hex signature a provider would send for `body` at `timestamp`.
    pub fn sign(self, secret: &[u8], body: &[u8], timestamp: &str) -> Result<String, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
        match self {
            SignatureScheme::BodyThenTimestamp => {
                mac.update(body);
                mac.update(timestamp.as_bytes());
            }
            SignatureScheme::TimestampDotBody => {
                let text = std::str::from_utf8(body).map_err(|_| SignatureError::NonUtf8Body)?;
                mac.update(timestamp.as_bytes());
                mac.update(b".");
                mac.update(text.as_bytes());
            }
        }
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a claimed signature. Empty header values count as absent.
    pub fn verify(
        self,
        secret: &[u8],
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), SignatureError> {
        let signature = signature
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingSignature)?;
        let timestamp = timestamp
            .filter(|t| !t.is_empty())
            .ok_or(SignatureError::MissingTimestamp)?;

        let expected = self.sign(secret, body, timestamp)?;
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}
