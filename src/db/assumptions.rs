//! Backing source for the assumption registry: the `sweet_spot_assumptions`
//! table plus an optional JSON seed file.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::SqlitePool;
use tracing::info;

use crate::config::default_assumptions;
use crate::db::models::AssumptionRow;
use crate::error::Result;
use crate::types::SweetSpotAssumption;

pub async fn load_assumptions(pool: &SqlitePool) -> Result<Vec<SweetSpotAssumption>> {
    let rows = sqlx::query_as::<_, AssumptionRow>(
        r#"
        SELECT niche, engagement_rate, conversion_rate, buyer_rate
        FROM sweet_spot_assumptions
        ORDER BY niche
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(SweetSpotAssumption::from).collect())
}

pub async fn upsert_assumption(pool: &SqlitePool, assumption: &SweetSpotAssumption) -> Result<()> {
    assumption.validate()?;
    sqlx::query(
        r#"
        INSERT INTO sweet_spot_assumptions (
            niche, engagement_rate, conversion_rate, buyer_rate, updated_at
        ) VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(niche) DO UPDATE SET
            engagement_rate = excluded.engagement_rate,
            conversion_rate = excluded.conversion_rate,
            buyer_rate = excluded.buyer_rate,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(assumption.niche.as_str())
    .bind(assumption.engagement_rate)
    .bind(assumption.conversion_rate)
    .bind(assumption.buyer_rate)
    .bind(now_ns() as i64)
    .execute(pool)
    .await?;
    Ok(())
}

/// Parses a JSON array of assumptions, rejecting the file if any record has
/// out-of-range rates.
pub fn parse_seed(json: &str) -> Result<Vec<SweetSpotAssumption>> {
    let assumptions: Vec<SweetSpotAssumption> = serde_json::from_str(json)?;
    for a in &assumptions {
        a.validate()?;
    }
    Ok(assumptions)
}

/// Upserts every assumption in the seed file. Returns how many were written.
pub async fn seed_from_file(pool: &SqlitePool, path: &Path) -> Result<usize> {
    let json = tokio::fs::read_to_string(path).await?;
    let assumptions = parse_seed(&json)?;
    for a in &assumptions {
        upsert_assumption(pool, a).await?;
    }
    info!(path = %path.display(), count = assumptions.len(), "Seeded assumptions from file");
    Ok(assumptions.len())
}

/// Writes the built-in defaults when the table is empty, so a fresh database
/// can analyze the common niches immediately.
pub async fn seed_defaults_if_empty(pool: &SqlitePool) -> Result<usize> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sweet_spot_assumptions")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(0);
    }
    let defaults = default_assumptions();
    for a in &defaults {
        upsert_assumption(pool, a).await?;
    }
    info!(count = defaults.len(), "Seeded default assumptions");
    Ok(defaults.len())
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
