use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::db::assumptions::{load_assumptions, upsert_assumption};
use crate::error::Result;
use crate::state::AssumptionRegistry;
use crate::types::SweetSpotAssumption;

/// Background task that reloads the assumption registry from the database.
/// The engine never refreshes its own rates; this is the only writer besides
/// assumption upserts, which go through [`AssumptionRefresher::upsert`] so
/// both writers share one lock.
#[derive(Clone)]
pub struct AssumptionRefresher {
    pool: SqlitePool,
    registry: Arc<AssumptionRegistry>,
    health: Arc<HealthState>,
    interval_secs: u64,
    // Held from DB read/write through registry swap.
    write_lock: Arc<Mutex<()>>,
}

impl AssumptionRefresher {
    pub fn new(
        pool: SqlitePool,
        registry: Arc<AssumptionRegistry>,
        health: Arc<HealthState>,
        interval_secs: u64,
    ) -> Self {
        Self {
            pool,
            registry,
            health,
            interval_secs,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        ticker.tick().await; // skip immediate first tick — bootstrap already loaded

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                self.health.inc_refresh_failures();
                error!("Assumption refresh failed: {e}");
            }
        }
    }

    /// Loads the table and swaps it into the registry. Returns the niche count.
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        self.reload().await
    }

    /// Persists one niche's rates, then reloads the registry from the table.
    /// A periodic refresh can never swap in a snapshot older than this write.
    pub async fn upsert(&self, assumption: &SweetSpotAssumption) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        upsert_assumption(&self.pool, assumption).await?;
        self.reload().await
    }

    async fn reload(&self) -> Result<usize> {
        let fresh = load_assumptions(&self.pool).await?;
        if fresh.is_empty() {
            warn!("Assumptions table is empty — every analysis will fail until rates are configured");
        }
        let before = self.registry.len();
        let count = self.registry.replace_all(fresh)?;
        self.health.record_refresh(count);

        info!(
            before = before,
            after = count,
            "Assumption refresh complete: {count} niches registered",
        );
        Ok(count)
    }
}
