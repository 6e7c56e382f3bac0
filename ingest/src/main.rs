//! Solva webhook ingestion daemon.
//!
//! Serves the MultiBaas and thirdweb Pay webhook endpoints, backed by
//! PostgreSQL when `--database-url` is given and by an in-process store
//! otherwise.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use solva_ingest::config::Cli;
use solva_ingest::memory::MemoryStore;
use solva_ingest::multibaas::MultiBaasClient;
use solva_ingest::pipeline::Ingestor;
use solva_ingest::postgres::PgStore;
use solva_ingest::routes::{self, AppState};
use solva_ingest::store::{TransactionLedger, UserDirectory};
use solva_ingest::telemetry;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

const DEV_FRONTEND_ORIGIN: &str = "http://localhost:5173";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level);

    // ── Store ──
    let directory: Arc<dyn UserDirectory>;
    let ledger: Arc<dyn TransactionLedger>;
    let store_kind = match &cli.database_url {
        Some(url) => {
            let store = Arc::new(
                PgStore::connect(url, cli.db_pool_size).context("invalid database URL")?,
            );
            store.migrate().await.context("database migration failed")?;
            directory = store.clone();
            ledger = store;
            "postgres"
        }
        None => {
            warn!("No --database-url given; transactions are kept in memory only");
            let store = Arc::new(MemoryStore::new());
            for (address, username) in &cli.dev_users {
                if store.register_user(address, username) {
                    info!(address = %address, username = %username, "Seeded dev user");
                }
            }
            directory = store.clone();
            ledger = store;
            "memory"
        }
    };

    let multibaas = match cli.multibaas_config() {
        Some(config) => Some(MultiBaasClient::new(config).context("failed to build HTTP client")?),
        None => {
            info!("MultiBaas not configured; webhook registration routes disabled");
            None
        }
    };

    let state = Arc::new(AppState {
        ingestor: Ingestor::new(directory, ledger, cli.ingest_config()),
        multibaas,
        store_kind,
    });

    let origin = if cli.dev {
        AllowOrigin::exact(HeaderValue::from_static(DEV_FRONTEND_ORIGIN))
    } else {
        AllowOrigin::list([])
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let app = routes::router(state).layer(cors);

    let addr = cli.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, store = store_kind, "Solva ingest listening");

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
