use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::db::EntryStore;
use crate::engine::{compute_batch, compute_funnel, rank_sweet_spots, summarize, summarize_by_niche};
use crate::error::Result;
use crate::state::AssumptionRegistry;
use crate::types::{
    Currency, EntryFields, Niche, NicheAnalysis, SweetSpotAnalysis, SweetSpotRanking,
    SweetSpotResult,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub results: Vec<SweetSpotResult>,
    pub analysis: SweetSpotAnalysis,
}

/// Ties the entry store to the engine: fetch a snapshot, resolve rates, run
/// the funnel, aggregate.
#[derive(Clone)]
pub struct AnalysisService {
    store: EntryStore,
    registry: Arc<AssumptionRegistry>,
    fallback: Option<Niche>,
    default_currency: Currency,
}

impl AnalysisService {
    pub fn new(
        store: EntryStore,
        registry: Arc<AssumptionRegistry>,
        fallback: Option<Niche>,
        default_currency: Currency,
    ) -> Self {
        Self { store, registry, fallback, default_currency }
    }

    pub fn registry(&self) -> &Arc<AssumptionRegistry> {
        &self.registry
    }

    /// Funnel for one stored entry.
    pub async fn funnel_for(&self, id: &str) -> Result<SweetSpotResult> {
        let entry = self.store.get_entry(id).await?;
        let assumption = self.registry.resolve_or(&entry.niche, self.fallback.as_ref())?;
        Ok(compute_funnel(&entry, &assumption)?)
    }

    /// Results and aggregate over every stored entry, or one niche's entries.
    pub async fn analyze(&self, niche: Option<&Niche>) -> Result<AnalysisReport> {
        let entries = match niche {
            Some(n) => self.store.list_entries_by_niche(n).await?,
            None => self.store.list_entries().await?,
        };
        let results = compute_batch(&entries, &self.registry, self.fallback.as_ref())?;
        let analysis = summarize(&results, &entries)?;
        debug!(
            entries = entries.len(),
            buyers = analysis.sales_per_month,
            grand_total = analysis.grand_total,
            "Analysis computed"
        );
        Ok(AnalysisReport { results, analysis })
    }

    pub async fn analyze_by_niche(&self) -> Result<Vec<NicheAnalysis>> {
        let entries = self.store.list_entries().await?;
        let results = compute_batch(&entries, &self.registry, self.fallback.as_ref())?;
        Ok(summarize_by_niche(&results, &entries)?)
    }

    pub async fn ranking(&self) -> Result<Vec<SweetSpotRanking>> {
        let entries = self.store.list_entries().await?;
        let results = compute_batch(&entries, &self.registry, self.fallback.as_ref())?;
        Ok(rank_sweet_spots(&results, &entries)?)
    }

    /// What-if analysis for an entry that is never stored.
    pub fn preview(&self, fields: EntryFields) -> Result<AnalysisReport> {
        let entry = fields.into_draft(self.default_currency)?;
        let assumption = self.registry.resolve_or(&entry.niche, self.fallback.as_ref())?;
        let result = compute_funnel(&entry, &assumption)?;
        let results = vec![result];
        let analysis = summarize(&results, std::slice::from_ref(&entry))?;
        Ok(AnalysisReport { results, analysis })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::engine::EngineError;
    use crate::error::AppError;
    use crate::types::{Platform, RevenueStream, SweetSpotAssumption};

    fn fields(niche: Niche, audience: i64, pricing: f64) -> EntryFields {
        EntryFields {
            account: "@creator".to_string(),
            niche,
            audience,
            platform: Platform::Youtube,
            revenue_stream: RevenueStream::Course,
            pricing,
            currency: None,
        }
    }

    async fn service(fallback: Option<Niche>) -> (AnalysisService, EntryStore) {
        let store = EntryStore::new(test_pool().await);
        let registry = AssumptionRegistry::new();
        registry
            .replace_all(vec![
                SweetSpotAssumption {
                    niche: Niche::Fitness,
                    engagement_rate: 0.3,
                    conversion_rate: 0.2,
                    buyer_rate: 0.1,
                },
                SweetSpotAssumption {
                    niche: Niche::Tech,
                    engagement_rate: 0.5,
                    conversion_rate: 0.5,
                    buyer_rate: 0.5,
                },
            ])
            .unwrap();
        (AnalysisService::new(store.clone(), registry, fallback, Currency::Idr), store)
    }

    #[tokio::test]
    async fn analyzes_stored_entries() {
        let (svc, store) = service(None).await;
        store.create_entry(fields(Niche::Fitness, 10_000, 100_000.0), Currency::Idr).await.unwrap();
        store.create_entry(fields(Niche::Tech, 9, 1_000.0), Currency::Idr).await.unwrap();

        let report = svc.analyze(None).await.unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.analysis.sales_per_month, 61);
        assert_eq!(report.analysis.grand_total, 6_001_000.0);
        assert_eq!(report.analysis.revenue_per_month, "Rp6.001.000");

        let tech = svc.analyze(Some(&Niche::Tech)).await.unwrap();
        assert_eq!(tech.analysis.sales_per_month, 1);
    }

    #[tokio::test]
    async fn empty_store_cannot_be_summarized() {
        let (svc, _) = service(None).await;
        let err = svc.analyze(None).await.unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::InvalidInput { .. })));
        assert!(svc.ranking().await.unwrap().is_empty());
        assert!(svc.analyze_by_niche().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_niche_propagates_without_fallback() {
        let (svc, store) = service(None).await;
        let entry = store
            .create_entry(fields(Niche::from("quantum-knitting"), 100, 1.0), Currency::Idr)
            .await
            .unwrap();

        let err = svc.funnel_for(&entry.id).await.unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::UnknownNiche(ref n)) if n == "quantum-knitting"));
        assert!(svc.analyze(None).await.is_err());
    }

    #[tokio::test]
    async fn fallback_covers_unknown_niche() {
        let (svc, store) = service(Some(Niche::Fitness)).await;
        let entry = store
            .create_entry(fields(Niche::from("quantum-knitting"), 10_000, 10.0), Currency::Idr)
            .await
            .unwrap();

        let result = svc.funnel_for(&entry.id).await.unwrap();
        assert_eq!(result.buyers, 60);
    }

    #[tokio::test]
    async fn breakdown_and_ranking() {
        let (svc, store) = service(None).await;
        store.create_entry(fields(Niche::Fitness, 10_000, 100_000.0), Currency::Idr).await.unwrap();
        store.create_entry(fields(Niche::Tech, 9, 1_000.0), Currency::Idr).await.unwrap();

        let groups = svc.analyze_by_niche().await.unwrap();
        let niches: Vec<&Niche> = groups.iter().map(|g| &g.niche).collect();
        assert_eq!(niches, [&Niche::Fitness, &Niche::Tech]);

        let ranking = svc.ranking().await.unwrap();
        assert_eq!(ranking[0].niche, Niche::Fitness);
        assert_eq!(ranking[0].revenue_per_follower, 600.0);
    }

    #[tokio::test]
    async fn preview_does_not_store() {
        let (svc, store) = service(None).await;
        let report = svc.preview(fields(Niche::Fitness, 10_000, 100_000.0)).unwrap();

        assert_eq!(report.results[0].buyers, 60);
        assert_eq!(report.analysis.product_price, "Rp100.000");
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
