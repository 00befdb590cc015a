use std::env;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use prop_relay::client::HttpLedgerClient;
use prop_relay::config::RelayConfig;
use prop_relay::dedup::{DedupGuard, FileClaimJournal};
use prop_relay::engine::RelayEngine;
use prop_relay::server;

#[actix_web::main]
async fn main() -> Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        eprintln!("tracing init failed: {e}");
    }

    let props_path =
        env::var("RELAY_SECRETS_FILE").unwrap_or_else(|_| "secretprops.properties".to_string());
    let config = RelayConfig::load(&props_path)
        .with_context(|| format!("failed to load configuration from '{props_path}'"))?;

    let journal_path =
        env::var("RELAY_CLAIMS_FILE").unwrap_or_else(|_| "relay-claims.jsonl".to_string());
    let journal = FileClaimJournal::open(&journal_path)
        .with_context(|| format!("failed to open claim journal '{journal_path}'"))?;
    let guard = DedupGuard::recover(Box::new(journal))
        .context("failed to replay claim journal")?;

    let ledger =
        Arc::new(HttpLedgerClient::new(&config).context("failed to build ledger client")?);
    let engine = web::Data::new(RelayEngine::new(config, ledger, guard));

    let port = env::var("RELAY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5010u16);
    info!(port, "starting relay");

    HttpServer::new(move || App::new().app_data(engine.clone()).configure(server::routes))
        .bind(("0.0.0.0", port))?
        .run()
        .await
        .context("server exited with error")
}
