//! Webhook registration against a Curvegrid MultiBaas deployment.
//!
//! One `reqwest::Client` is built at startup and shared by every request, so
//! connections to the deployment are pooled for the life of the process.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// MultiBaas event type for decoded contract events.
const EVENT_EMITTED: &str = "event.emitted";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct MultiBaasConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MultiBaasError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// MultiBaas wraps every payload in `{status, message, result}`.
#[derive(Deserialize)]
struct Envelope<T> {
    status: u16,
    #[serde(default)]
    message: String,
    result: Option<T>,
}

/// A registered webhook as MultiBaas reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: i64,
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Serialize)]
struct CreateWebhook<'a> {
    label: &'a str,
    url: &'a str,
    events: [&'a str; 1],
}

pub struct MultiBaasClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MultiBaasClient {
    pub fn new(config: MultiBaasConfig) -> Result<Self, MultiBaasError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: config.base_url,
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v0{}", self.base_url, path)
    }

    /// Register `url` to receive contract events. The returned webhook carries
    /// the signing secret for our signature gate.
    pub async fn create_webhook(&self, url: &str, label: &str) -> Result<Webhook, MultiBaasError> {
        let body = CreateWebhook {
            label,
            url,
            events: [EVENT_EMITTED],
        };
        let resp = self
            .http
            .post(self.url("/webhooks"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let webhook: Webhook = unwrap_envelope(resp).await?;
        info!(webhook_id = webhook.id, label, "Created MultiBaas webhook");
        Ok(webhook)
    }

    /// `Ok(None)` when MultiBaas does not know the id.
    pub async fn get_webhook(&self, id: i64) -> Result<Option<Webhook>, MultiBaasError> {
        let resp = self
            .http
            .get(self.url(&format!("/webhooks/{id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(webhook_id = id, "MultiBaas webhook not found");
            return Ok(None);
        }
        let webhook = unwrap_envelope(resp.error_for_status()?).await?;
        Ok(Some(webhook))
    }

    pub async fn delete_webhook(&self, id: i64) -> Result<(), MultiBaasError> {
        self.http
            .delete(self.url(&format!("/webhooks/{id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;
        info!(webhook_id = id, "Deleted MultiBaas webhook");
        Ok(())
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, MultiBaasError> {
    let envelope: Envelope<T> = resp.json().await?;
    if envelope.status != 200 {
        return Err(MultiBaasError::Unexpected(format!(
            "status {}: {}",
            envelope.status, envelope.message
        )));
    }
    envelope
        .result
        .ok_or_else(|| MultiBaasError::Unexpected("missing result".to_string()))
}
