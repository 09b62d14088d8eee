//! Database row types for the `sweet_spot_entries` and
//! `sweet_spot_assumptions` tables (see `migrations/`).

use chrono::{DateTime, Utc};

use crate::engine::EngineError;
use crate::types::{check_audience, Money, Niche, Platform, RevenueStream, SweetSpotAssumption, SweetSpotEntry};

#[derive(Debug, sqlx::FromRow)]
pub struct EntryRow {
    pub id: String,
    pub account: String,
    pub niche: String,
    pub audience: i64,
    pub platform: String,
    pub revenue_stream: String,
    pub pricing: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<EntryRow> for SweetSpotEntry {
    type Error = EngineError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let audience = check_audience(row.audience).map_err(|e| match e {
            EngineError::InvalidInput { field, reason } => {
                EngineError::InvalidInput { field, reason: format!("entry {}: {reason}", row.id) }
            }
            other => other,
        })?;
        let currency = row.currency.parse()?;
        Ok(SweetSpotEntry {
            id: row.id,
            account: row.account,
            niche: Niche::from(row.niche),
            audience,
            platform: Platform::from(row.platform),
            revenue_stream: RevenueStream::from(row.revenue_stream),
            pricing: Money::new(row.pricing, currency),
            created_at: Some(row.created_at),
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AssumptionRow {
    pub niche: String,
    pub engagement_rate: f64,
    pub conversion_rate: f64,
    pub buyer_rate: f64,
}

impl From<AssumptionRow> for SweetSpotAssumption {
    fn from(row: AssumptionRow) -> Self {
        SweetSpotAssumption {
            niche: Niche::from(row.niche),
            engagement_rate: row.engagement_rate,
            conversion_rate: row.conversion_rate,
            buyer_rate: row.buyer_rate,
        }
    }
}
