use clap::Parser;
use solva_common::replay::{ReplayWindow, MAX_CLOCK_SKEW_SECS, MAX_WEBHOOK_AGE_SECS};

use crate::multibaas::MultiBaasConfig;

#[derive(Parser)]
#[command(name = "solva-ingest", about = "Solva payment webhook ingestion service")]
pub struct Cli {
    /// HTTP port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    /// PostgreSQL connection URL. Without it an in-process store is used
    /// and nothing survives a restart.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum pooled database connections.
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 16)]
    pub db_pool_size: usize,

    /// Shared secret for MultiBaas webhook signatures.
    #[arg(long, env = "CURVEGRID_WEBHOOK_SECRET", hide_env_values = true)]
    pub curvegrid_webhook_secret: String,

    /// Shared secret for thirdweb Pay webhook signatures.
    #[arg(long, env = "THIRDWEB_WEBHOOK_SECRET", hide_env_values = true)]
    pub thirdweb_webhook_secret: String,

    /// MultiBaas deployment base URL (enables webhook registration routes).
    #[arg(long, env = "CURVEGRID_DEPLOYMENT_URL")]
    pub curvegrid_deployment_url: Option<String>,

    /// MultiBaas API key.
    #[arg(long, env = "CURVEGRID_API_KEY", hide_env_values = true)]
    pub curvegrid_api_key: Option<String>,

    /// Reject deliveries stamped more than this many seconds ago.
    #[arg(long, env = "MAX_WEBHOOK_AGE_SECS", default_value_t = MAX_WEBHOOK_AGE_SECS)]
    pub max_webhook_age_secs: i64,

    /// Reject deliveries stamped more than this many seconds in the future.
    #[arg(long, env = "MAX_CLOCK_SKEW_SECS", default_value_t = MAX_CLOCK_SKEW_SECS)]
    pub max_clock_skew_secs: i64,

    /// Events of one delivery processed concurrently.
    #[arg(long, env = "EVENT_CONCURRENCY", default_value_t = 8)]
    pub event_concurrency: usize,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Allow the local front end origin through CORS.
    #[arg(long, env = "IS_DEVELOPMENT")]
    pub dev: bool,

    /// Seed the in-process store with `address=username` (repeatable).
    /// Ignored when a database is configured.
    #[arg(long = "dev-user", value_parser = parse_dev_user)]
    pub dev_users: Vec<(String, String)>,
}

fn parse_dev_user(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((address, username)) if !address.is_empty() && !username.is_empty() => {
            Ok((address.to_string(), username.to_string()))
        }
        _ => Err(format!("expected address=username, got {s:?}")),
    }
}

impl Cli {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            curvegrid_secret: self.curvegrid_webhook_secret.clone(),
            thirdweb_secret: self.thirdweb_webhook_secret.clone(),
            replay: ReplayWindow {
                max_age_secs: self.max_webhook_age_secs,
                max_skew_secs: self.max_clock_skew_secs,
            },
            event_concurrency: self.event_concurrency.max(1),
        }
    }

    /// Both the deployment URL and the API key are needed to talk to MultiBaas.
    pub fn multibaas_config(&self) -> Option<MultiBaasConfig> {
        match (&self.curvegrid_deployment_url, &self.curvegrid_api_key) {
            (Some(base_url), Some(api_key)) => Some(MultiBaasConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.clone(),
            }),
            _ => None,
        }
    }
}

/// Settings the ingestion pipeline needs, independent of how they were sourced.
#[derive(Clone)]
pub struct IngestConfig {
    pub curvegrid_secret: String,
    pub thirdweb_secret: String,
    pub replay: ReplayWindow,
    pub event_concurrency: usize,
}

impl IngestConfig {
    /// Defaults for everything but the secrets.
    pub fn with_secrets(curvegrid_secret: impl Into<String>, thirdweb_secret: impl Into<String>) -> Self {
        Self {
            curvegrid_secret: curvegrid_secret.into(),
            thirdweb_secret: thirdweb_secret.into(),
            replay: ReplayWindow::default(),
            event_concurrency: 8,
        }
    }
}
