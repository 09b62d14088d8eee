use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::models::EntryRow;
use crate::error::{AppError, Result};
use crate::types::{Currency, EntryFields, Niche, SweetSpotEntry};

const SELECT_ENTRY: &str = r#"
    SELECT id, account, niche, audience, platform, revenue_stream,
           pricing, currency, created_at, updated_at
    FROM sweet_spot_entries
"#;

/// Durable storage of sweet-spot entries. The analysis engine only ever reads
/// snapshots from here.
#[derive(Clone)]
pub struct EntryStore {
    pool: SqlitePool,
}

impl EntryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All entries, oldest first.
    pub async fn list_entries(&self) -> Result<Vec<SweetSpotEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!("{SELECT_ENTRY} ORDER BY created_at, id"))
            .fetch_all(&self.pool)
            .await?;
        into_entries(rows)
    }

    pub async fn list_entries_by_niche(&self, niche: &Niche) -> Result<Vec<SweetSpotEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "{SELECT_ENTRY} WHERE niche = ? ORDER BY created_at, id"
        ))
        .bind(niche.as_str())
        .fetch_all(&self.pool)
        .await?;
        into_entries(rows)
    }

    pub async fn get_entry(&self, id: &str) -> Result<SweetSpotEntry> {
        let row = sqlx::query_as::<_, EntryRow>(&format!("{SELECT_ENTRY} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("entry {id}")))?;
        Ok(SweetSpotEntry::try_from(row)?)
    }

    /// Validates and stores a new entry, assigning its id and `createdAt`.
    pub async fn create_entry(&self, fields: EntryFields, default_currency: Currency) -> Result<SweetSpotEntry> {
        let (audience, pricing) = fields.validate(default_currency)?;
        let entry = SweetSpotEntry {
            id: Uuid::new_v4().to_string(),
            account: fields.account.trim().to_string(),
            niche: fields.niche,
            audience,
            platform: fields.platform,
            revenue_stream: fields.revenue_stream,
            pricing,
            created_at: Some(Utc::now()),
            updated_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO sweet_spot_entries (
                id, account, niche, audience, platform, revenue_stream,
                pricing, currency, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account)
        .bind(entry.niche.as_str())
        .bind(stored_audience(audience)?)
        .bind(entry.platform.as_str())
        .bind(entry.revenue_stream.as_str())
        .bind(entry.pricing.amount)
        .bind(entry.pricing.currency.code())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            entry_id = %entry.id,
            niche = %entry.niche,
            audience = entry.audience,
            "Entry created"
        );
        Ok(entry)
    }

    /// Replaces an entry's fields and stamps `updatedAt`. `createdAt` and the
    /// id never change.
    pub async fn update_entry(
        &self,
        id: &str,
        fields: EntryFields,
        default_currency: Currency,
    ) -> Result<SweetSpotEntry> {
        let (audience, pricing) = fields.validate(default_currency)?;
        let updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sweet_spot_entries
            SET account = ?, niche = ?, audience = ?, platform = ?, revenue_stream = ?,
                pricing = ?, currency = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fields.account.trim())
        .bind(fields.niche.as_str())
        .bind(stored_audience(audience)?)
        .bind(fields.platform.as_str())
        .bind(fields.revenue_stream.as_str())
        .bind(pricing.amount)
        .bind(pricing.currency.code())
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("entry {id}")));
        }
        debug!(entry_id = %id, "Entry updated");
        self.get_entry(id).await
    }

    pub async fn delete_entry(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM sweet_spot_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("entry {id}")));
        }
        info!(entry_id = %id, "Entry deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sweet_spot_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

fn into_entries(rows: Vec<EntryRow>) -> Result<Vec<SweetSpotEntry>> {
    rows.into_iter()
        .map(|row| SweetSpotEntry::try_from(row).map_err(AppError::from))
        .collect()
}

/// SQLite integers are signed.
fn stored_audience(audience: u64) -> Result<i64> {
    i64::try_from(audience).map_err(|_| {
        AppError::from(crate::engine::EngineError::invalid(
            "audience",
            format!("{audience} exceeds the storable range"),
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
