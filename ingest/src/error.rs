//! Failure taxonomy.
//!
//! Delivery-level failures ([`Unauthenticated`]) and per-event failures
//! ([`EventError`]) are separate types, so a function's signature says
//! whether it can abort a whole delivery.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use solva_common::event::NormalizeError;

use crate::multibaas::MultiBaasError;
use crate::store::StoreError;

/// A delivery failed a gate step. The reason is logged where the gate fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unauthenticated")]
pub struct Unauthenticated;

/// Why one event of a delivery did not produce a ledger row.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] NormalizeError),
    #[error("counterparty {0} is not an onboarded user")]
    UnresolvedCounterparty(String),
    #[error("transaction {0} already recorded")]
    DuplicateTransaction(String),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP projection of everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("upstream: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<Unauthenticated> for ApiError {
    fn from(_: Unauthenticated) -> Self {
        ApiError::Unauthenticated
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Unavailable(format!("storage unavailable: {e}"))
    }
}

impl From<MultiBaasError> for ApiError {
    fn from(e: MultiBaasError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
