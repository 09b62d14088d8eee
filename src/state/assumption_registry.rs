use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::engine::EngineError;
use crate::types::{Niche, SweetSpotAssumption};

// ---------------------------------------------------------------------------
// AssumptionRegistry
// ---------------------------------------------------------------------------

/// Niche → behavioral rates. Read by the funnel, written only by the
/// out-of-band loader (startup load and the refresher).
pub struct AssumptionRegistry {
    assumptions: DashMap<Niche, SweetSpotAssumption>,
}

impl AssumptionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, niche: &Niche) -> Result<SweetSpotAssumption, EngineError> {
        self.assumptions
            .get(niche)
            .map(|a| a.clone())
            .ok_or_else(|| EngineError::UnknownNiche(niche.to_string()))
    }

    /// Resolves `niche`, or the caller's `fallback` niche re-keyed to `niche`
    /// when the first lookup misses. A missing fallback still reports the
    /// original niche as unknown.
    pub fn resolve_or(
        &self,
        niche: &Niche,
        fallback: Option<&Niche>,
    ) -> Result<SweetSpotAssumption, EngineError> {
        match (self.resolve(niche), fallback) {
            (Ok(a), _) => Ok(a),
            (Err(e), None) => Err(e),
            (Err(e), Some(fb)) => self
                .assumptions
                .get(fb)
                .map(|a| a.rekeyed(niche.clone()))
                .ok_or(e),
        }
    }

    /// Replaces the whole table. Every record is validated before anything is
    /// written; one bad record rejects the load and leaves the table as it was.
    /// Returns the number of niches now registered.
    pub fn replace_all(&self, assumptions: Vec<SweetSpotAssumption>) -> Result<usize, EngineError> {
        for a in &assumptions {
            a.validate()?;
        }

        let keep: HashSet<Niche> = assumptions.iter().map(|a| a.niche.clone()).collect();
        // Insert first, then prune, so niches in both tables never go missing.
        for a in assumptions {
            self.assumptions.insert(a.niche.clone(), a);
        }
        self.assumptions.retain(|niche, _| keep.contains(niche));
        Ok(self.assumptions.len())
    }

    pub fn len(&self) -> usize {
        self.assumptions.len()
    }

    /// Registered niches, sorted by name.
    pub fn niches(&self) -> Vec<Niche> {
        let mut niches: Vec<Niche> = self.assumptions.iter().map(|e| e.key().clone()).collect();
        niches.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        niches
    }

    /// Copy of every assumption, sorted by niche name.
    pub fn snapshot(&self) -> Vec<SweetSpotAssumption> {
        let mut all: Vec<SweetSpotAssumption> =
            self.assumptions.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.niche.as_str().cmp(b.niche.as_str()));
        all
    }
}

impl Default for AssumptionRegistry {
    fn default() -> Self {
        Self {
            assumptions: DashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assumption(niche: &str, e: f64, c: f64, b: f64) -> SweetSpotAssumption {
        SweetSpotAssumption {
            niche: Niche::from(niche),
            engagement_rate: e,
            conversion_rate: c,
            buyer_rate: b,
        }
    }

    #[test]
    fn resolves_registered_niche() {
        let registry = AssumptionRegistry::new();
        registry.replace_all(vec![assumption("fitness", 0.3, 0.2, 0.1)]).unwrap();

        let a = registry.resolve(&Niche::Fitness).unwrap();
        assert_eq!(a.engagement_rate, 0.3);
    }

    #[test]
    fn unknown_niche_is_an_error() {
        let registry = AssumptionRegistry::new();
        registry.replace_all(vec![assumption("fitness", 0.3, 0.2, 0.1)]).unwrap();

        let err = registry.resolve(&Niche::from("quantum-knitting")).unwrap_err();
        assert_eq!(err, EngineError::UnknownNiche("quantum-knitting".to_string()));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let registry = AssumptionRegistry::new();
        registry.replace_all(vec![assumption("fitness", 0.3, 0.2, 0.1)]).unwrap();

        assert!(registry.resolve(&Niche::from("Fitness")).is_err());
    }

    #[test]
    fn fallback_is_rekeyed_to_requested_niche() {
        let registry = AssumptionRegistry::new();
        registry.replace_all(vec![assumption("lifestyle", 0.2, 0.1, 0.05)]).unwrap();

        let niche = Niche::from("pottery");
        let a = registry.resolve_or(&niche, Some(&Niche::Lifestyle)).unwrap();
        assert_eq!(a.niche, niche);
        assert_eq!(a.buyer_rate, 0.05);

        let err = registry.resolve_or(&niche, Some(&Niche::Tech)).unwrap_err();
        assert_eq!(err, EngineError::UnknownNiche("pottery".to_string()));
    }

    #[test]
    fn replace_all_prunes_missing_niches() {
        let registry = AssumptionRegistry::new();
        registry
            .replace_all(vec![assumption("fitness", 0.3, 0.2, 0.1), assumption("tech", 0.1, 0.1, 0.1)])
            .unwrap();
        let n = registry.replace_all(vec![assumption("tech", 0.2, 0.2, 0.2)]).unwrap();

        assert_eq!(n, 1);
        assert!(registry.resolve(&Niche::Fitness).is_err());
        assert_eq!(registry.resolve(&Niche::Tech).unwrap().engagement_rate, 0.2);
    }

    #[test]
    fn invalid_load_keeps_previous_table() {
        let registry = AssumptionRegistry::new();
        registry.replace_all(vec![assumption("fitness", 0.3, 0.2, 0.1)]).unwrap();

        let result = registry.replace_all(vec![
            assumption("tech", 0.2, 0.2, 0.2),
            assumption("food", 1.5, 0.2, 0.2),
        ]);
        assert!(result.is_err());
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(&Niche::Fitness).is_ok());
        assert!(registry.resolve(&Niche::Tech).is_err());
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let registry = AssumptionRegistry::new();
        registry
            .replace_all(vec![
                assumption("tech", 0.1, 0.1, 0.1),
                assumption("beauty", 0.1, 0.1, 0.1),
                assumption("finance", 0.1, 0.1, 0.1),
            ])
            .unwrap();

        let names: Vec<String> = registry.niches().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["beauty", "finance", "tech"]);
        assert_eq!(registry.snapshot()[0].niche, Niche::Beauty);
    }
}
