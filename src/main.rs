mod analysis;
mod api;
mod assumption_refresh;
mod config;
mod db;
mod engine;
mod error;
mod state;
mod types;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::AnalysisService;
use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::assumption_refresh::AssumptionRefresher;
use crate::config::Config;
use crate::db::assumptions::{seed_defaults_if_empty, seed_from_file};
use crate::db::EntryStore;
use crate::error::Result;
use crate::state::AssumptionRegistry;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Assumption source ---
    if let Some(path) = &cfg.assumptions_path {
        seed_from_file(&pool, path).await?;
    }
    seed_defaults_if_empty(&pool).await?;

    // --- In-memory assumption registry ---
    let registry = AssumptionRegistry::new();
    let health = Arc::new(HealthState::new());
    let refresher = AssumptionRefresher::new(
        pool.clone(),
        Arc::clone(&registry),
        Arc::clone(&health),
        cfg.assumption_refresh_secs,
    );
    let count = refresher.refresh().await?;
    info!(
        "Registry loaded: {count} niches ({})",
        registry
            .niches()
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );

    match &cfg.fallback_niche {
        Some(niche) if registry.resolve(niche).is_err() => {
            warn!("FALLBACK_NICHE={niche} has no registered assumption — unknown niches will still be rejected");
        }
        Some(niche) => info!("Unknown niches fall back to the {niche} assumption"),
        None => info!("FALLBACK_NICHE not set — entries with unregistered niches will be rejected"),
    }

    // Assumption refresher (background, every ASSUMPTION_REFRESH_SECS)
    let background = refresher.clone();
    tokio::spawn(async move { background.run().await });

    // --- HTTP API server ---
    let store = EntryStore::new(pool.clone());
    let service = AnalysisService::new(
        store.clone(),
        Arc::clone(&registry),
        cfg.fallback_niche.clone(),
        cfg.default_currency,
    );
    let api_state = ApiState {
        refresher,
        store,
        service,
        health,
        default_currency: cfg.default_currency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
