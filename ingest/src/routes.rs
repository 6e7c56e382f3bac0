use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solva_common::payment::Transaction;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::{ApiError, EventError};
use crate::multibaas::MultiBaasClient;
use crate::pipeline::{BatchResponse, Ingestor};
use crate::provider::Provider;

pub struct AppState {
    pub ingestor: Ingestor,
    pub multibaas: Option<MultiBaasClient>,
    /// "postgres" or "memory", reported by /health.
    pub store_kind: &'static str,
}

// ─── API types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
}

#[derive(Deserialize)]
pub struct WebhookCreateRequest {
    pub url: String,
    pub label: String,
}

#[derive(Serialize, Deserialize)]
pub struct WebhookCreateResponse {
    pub webhook_id: i64,
    pub secret: String,
}

#[derive(Deserialize)]
pub struct WebhookDeleteRequest {
    pub webhook_id: i64,
    pub secret: String,
}

#[derive(Serialize)]
struct StatusMessage {
    status: &'static str,
    message: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/curvegrid/internal-webhook", post(multibaas_webhook_handler))
        .route(
            "/curvegrid/webhook",
            post(create_webhook_handler).delete(delete_webhook_handler),
        )
        .route("/thirdweb/webhook", post(thirdweb_webhook_handler))
        .route("/transactions/{address}", get(history_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Signature and timestamp gates over the untouched body.
fn authenticate(
    state: &AppState,
    provider: Provider,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ApiError> {
    state.ingestor.authenticate(
        provider,
        body,
        header(headers, provider.timestamp_header()),
        header(headers, provider.signature_header()),
        Utc::now().timestamp(),
    )?;
    Ok(())
}

// ─── Webhook deliveries ─────────────────────────────────────────────────────

async fn multibaas_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BatchResponse>, ApiError> {
    authenticate(&state, Provider::MultiBaas, &headers, &body)?;

    let events: Vec<Value> = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "MultiBaas delivery is not a JSON array");
        ApiError::BadRequest(format!("expected a JSON array of events: {e}"))
    })?;

    let summary = state.ingestor.ingest_batch(events).await;
    Ok(Json(summary.into_response()))
}

async fn thirdweb_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    authenticate(&state, Provider::ThirdwebPay, &headers, &body)?;

    let envelope: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))?;

    match state.ingestor.ingest_envelope(envelope).await {
        Ok(_)
        | Err(EventError::DuplicateTransaction(_))
        | Err(EventError::UnresolvedCounterparty(_)) => Ok(StatusCode::OK),
        Err(EventError::MalformedEvent(e)) => {
            Err(ApiError::BadRequest(format!("Unsupported webhook type: {e}")))
        }
        // Surfaced so the provider retries; the retry is idempotent.
        Err(EventError::Storage(e)) => Err(e.into()),
    }
}

// ─── Reads ──────────────────────────────────────────────────────────────────

async fn history_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(state.ingestor.history(&address).await?))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.store_kind,
    })
}

// ─── MultiBaas webhook registration ─────────────────────────────────────────

fn multibaas(state: &AppState) -> Result<&MultiBaasClient, ApiError> {
    state
        .multibaas
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("MultiBaas is not configured".to_string()))
}

async fn create_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WebhookCreateRequest>,
) -> Result<Json<WebhookCreateResponse>, ApiError> {
    let webhook = multibaas(&state)?
        .create_webhook(&req.url, &req.label)
        .await?;
    Ok(Json(WebhookCreateResponse {
        webhook_id: webhook.id,
        secret: webhook.secret,
    }))
}

async fn delete_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WebhookDeleteRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let client = multibaas(&state)?;
    let webhook = client.get_webhook(req.webhook_id).await?.ok_or_else(|| {
        ApiError::NotFound(format!("Webhook with ID {} not found", req.webhook_id))
    })?;

    if !bool::from(webhook.secret.as_bytes().ct_eq(req.secret.as_bytes())) {
        warn!(webhook_id = req.webhook_id, "Invalid secret for webhook deletion");
        return Err(ApiError::Forbidden("Invalid webhook secret".to_string()));
    }

    client.delete_webhook(req.webhook_id).await?;
    Ok(Json(StatusMessage {
        status: "success",
        message: format!("Webhook {} deleted successfully", req.webhook_id),
    }))
}
