use crate::engine::EngineError;
use crate::state::AssumptionRegistry;
use crate::types::{Money, Niche, SweetSpotAssumption, SweetSpotEntry, SweetSpotResult, MAX_AUDIENCE};

/// Runs one entry through the three-stage funnel.
///
/// Each stage floors to whole people before the next rate applies, so
/// `audience = 9` at 0.5/0.5/0.5 gives 4 → 2 → 1 buyers rather than
/// `floor(9 * 0.125) = 1` by coincidence.
pub fn compute_funnel(
    entry: &SweetSpotEntry,
    assumption: &SweetSpotAssumption,
) -> Result<SweetSpotResult, EngineError> {
    if entry.niche != assumption.niche {
        return Err(EngineError::invalid(
            "niche",
            format!(
                "entry niche {:?} does not match assumption niche {:?}",
                entry.niche.as_str(),
                assumption.niche.as_str()
            ),
        ));
    }
    assumption.validate()?;
    if entry.audience > MAX_AUDIENCE {
        return Err(EngineError::invalid(
            "audience",
            format!("must be <= {MAX_AUDIENCE}, got {}", entry.audience),
        ));
    }
    if !entry.pricing.amount.is_finite() || entry.pricing.amount < 0.0 {
        return Err(EngineError::invalid(
            "pricing",
            format!("must be a finite amount >= 0, got {}", entry.pricing.amount),
        ));
    }

    let engaged_audience = stage(entry.audience, assumption.engagement_rate);
    let interested_audience = stage(engaged_audience, assumption.conversion_rate);
    let buyers = stage(interested_audience, assumption.buyer_rate);
    let revenue = Money::new(buyers as f64 * entry.pricing.amount, entry.pricing.currency);
    if !revenue.amount.is_finite() {
        return Err(EngineError::invalid(
            "pricing",
            format!("revenue overflows: {buyers} buyers at {}", entry.pricing.amount),
        ));
    }

    Ok(SweetSpotResult {
        niche: entry.niche.clone(),
        engaged_audience,
        interested_audience,
        buyers,
        revenue,
    })
}

/// Resolves every entry's assumption and maps it through the funnel.
///
/// Any failure aborts the batch; no partial result vector is returned.
pub fn compute_batch(
    entries: &[SweetSpotEntry],
    registry: &AssumptionRegistry,
    fallback: Option<&Niche>,
) -> Result<Vec<SweetSpotResult>, EngineError> {
    entries
        .iter()
        .map(|entry| {
            let assumption = registry.resolve_or(&entry.niche, fallback)?;
            compute_funnel(entry, &assumption)
        })
        .collect()
}

#[inline]
fn stage(population: u64, rate: f64) -> u64 {
    // rate is validated to [0, 1], so the product never exceeds population.
    (population as f64 * rate).floor() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
