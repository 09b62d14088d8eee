use std::collections::BTreeMap;

use crate::engine::EngineError;
use crate::types::{
    Currency, Money, NicheAnalysis, SweetSpotAnalysis, SweetSpotEntry, SweetSpotRanking,
    SweetSpotResult,
};

/// Aggregates index-aligned results and entries into the display record.
///
/// One observation period counts as one month, so `salesPerMonth` is the
/// total buyer count.
pub fn summarize(
    results: &[SweetSpotResult],
    entries: &[SweetSpotEntry],
) -> Result<SweetSpotAnalysis, EngineError> {
    check_aligned(results, entries)?;
    let Some(first) = entries.first() else {
        return Err(EngineError::invalid("entries", "at least one entry is required"));
    };
    let currency = single_currency(entries)?.unwrap_or(first.pricing.currency);

    let grand_total: f64 = results.iter().map(|r| r.revenue.amount).sum();
    if !grand_total.is_finite() {
        return Err(EngineError::invalid("pricing", "grand total revenue overflows"));
    }
    let total_audience = checked_total("audience", entries.iter().map(|e| e.audience))?;
    let total_buyers = checked_total("buyers", results.iter().map(|r| r.buyers))?;
    let conversion = if total_audience > 0 {
        total_buyers as f64 / total_audience as f64
    } else {
        0.0
    };

    Ok(SweetSpotAnalysis {
        grand_total,
        currency,
        conversion,
        sales_per_month: total_buyers,
        revenue_per_month: format_currency(Money::new(grand_total, currency)),
        product_price: format_currency(first.pricing),
    })
}

/// Summarizes each niche on its own, ordered by niche name.
pub fn summarize_by_niche(
    results: &[SweetSpotResult],
    entries: &[SweetSpotEntry],
) -> Result<Vec<NicheAnalysis>, EngineError> {
    check_aligned(results, entries)?;

    let mut groups: BTreeMap<String, (Vec<SweetSpotResult>, Vec<SweetSpotEntry>)> = BTreeMap::new();
    for (r, e) in results.iter().zip(entries) {
        let group = groups.entry(e.niche.to_string()).or_default();
        group.0.push(r.clone());
        group.1.push(e.clone());
    }

    groups
        .into_values()
        .map(|(rs, es)| {
            let analysis = summarize(&rs, &es)?;
            Ok(NicheAnalysis {
                niche: es[0].niche.clone(),
                entries: es.len(),
                analysis,
            })
        })
        .collect()
}

/// Orders entries by revenue per audience member, best first. Ties go to the
/// lower entry id so the ordering is stable across calls. Entries priced in
/// different currencies are not comparable and are rejected.
pub fn rank_sweet_spots(
    results: &[SweetSpotResult],
    entries: &[SweetSpotEntry],
) -> Result<Vec<SweetSpotRanking>, EngineError> {
    check_aligned(results, entries)?;
    single_currency(entries)?;

    let mut ranking: Vec<SweetSpotRanking> = results
        .iter()
        .zip(entries)
        .map(|(r, e)| SweetSpotRanking {
            entry_id: e.id.clone(),
            account: e.account.clone(),
            niche: e.niche.clone(),
            platform: e.platform.clone(),
            revenue_stream: e.revenue_stream.clone(),
            revenue_per_follower: if e.audience > 0 {
                r.revenue.amount / e.audience as f64
            } else {
                0.0
            },
            revenue: r.revenue,
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.revenue_per_follower
            .total_cmp(&a.revenue_per_follower)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    Ok(ranking)
}

/// Renders whole currency units with the currency's symbol and grouping,
/// e.g. `Rp1.234.568`, `$1,234,568`. Rounds half away from zero.
pub fn format_currency(money: Money) -> String {
    let Money { amount, currency } = money;
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    format!("{sign}{}{}", currency.symbol(), group_digits(&digits, currency))
}

fn group_digits(digits: &str, currency: Currency) -> String {
    let sep = currency.group_separator();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// The one currency every entry is priced in; `None` for an empty slice.
fn single_currency(entries: &[SweetSpotEntry]) -> Result<Option<Currency>, EngineError> {
    let Some(first) = entries.first() else {
        return Ok(None);
    };
    let currency = first.pricing.currency;
    if let Some(other) = entries.iter().find(|e| e.pricing.currency != currency) {
        return Err(EngineError::invalid(
            "pricing",
            format!(
                "mixed currencies: entry {} is {} but entry {} is {}",
                first.id, currency, other.id, other.pricing.currency
            ),
        ));
    }
    Ok(Some(currency))
}

fn checked_total(field: &str, mut values: impl Iterator<Item = u64>) -> Result<u64, EngineError> {
    values.try_fold(0u64, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| EngineError::invalid(field, "total overflows a 64-bit count"))
    })
}

fn check_aligned(results: &[SweetSpotResult], entries: &[SweetSpotEntry]) -> Result<(), EngineError> {
    if results.len() != entries.len() {
        return Err(EngineError::MismatchedInput {
            results: results.len(),
            entries: entries.len(),
            detail: "lengths differ".to_string(),
        });
    }
    if let Some((i, (r, e))) = results
        .iter()
        .zip(entries)
        .enumerate()
        .find(|(_, (r, e))| r.niche != e.niche)
    {
        return Err(EngineError::MismatchedInput {
            results: results.len(),
            entries: entries.len(),
            detail: format!("index {i}: result niche {} vs entry niche {}", r.niche, e.niche),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compute_funnel;
    use crate::types::{Niche, Platform, RevenueStream, SweetSpotAssumption};

    fn entry(id: &str, niche: Niche, audience: u64, pricing: f64) -> SweetSpotEntry {
        SweetSpotEntry {
            id: id.to_string(),
            account: format!("@{id}"),
            niche,
            audience,
            platform: Platform::Instagram,
            revenue_stream: RevenueStream::Affiliate,
            pricing: Money::new(pricing, Currency::Idr),
            created_at: None,
            updated_at: None,
        }
    }

    fn run(entries: &[SweetSpotEntry]) -> Vec<SweetSpotResult> {
        entries
            .iter()
            .map(|e| {
                let a = SweetSpotAssumption {
                    niche: e.niche.clone(),
                    engagement_rate: 0.3,
                    conversion_rate: 0.2,
                    buyer_rate: 0.1,
                };
                compute_funnel(e, &a).unwrap()
            })
            .collect()
    }

    #[test]
    fn formats_each_currency() {
        assert_eq!(format_currency(Money::new(1_234_567.5, Currency::Idr)), "Rp1.234.568");
        assert_eq!(format_currency(Money::new(1_234_567.5, Currency::Usd)), "$1,234,568");
        assert_eq!(format_currency(Money::new(1_234_567.5, Currency::Eur)), "€1.234.568");
    }

    #[test]
    fn formats_small_and_boundary_amounts() {
        assert_eq!(format_currency(Money::zero(Currency::Idr)), "Rp0");
        assert_eq!(format_currency(Money::new(0.4, Currency::Usd)), "$0");
        assert_eq!(format_currency(Money::new(999.5, Currency::Usd)), "$1,000");
        assert_eq!(format_currency(Money::new(100_000.0, Currency::Idr)), "Rp100.000");
        assert_eq!(format_currency(Money::new(-2500.0, Currency::Usd)), "-$2,500");
    }

    #[test]
    fn summarize_reference_scenario() {
        let entries = vec![entry("a", Niche::Fitness, 10_000, 100_000.0)];
        let analysis = summarize(&run(&entries), &entries).unwrap();

        assert_eq!(analysis.grand_total, 6_000_000.0);
        assert_eq!(analysis.sales_per_month, 60);
        assert!((analysis.conversion - 0.006).abs() < 1e-12);
        assert_eq!(analysis.revenue_per_month, "Rp6.000.000");
        assert_eq!(analysis.product_price, "Rp100.000");
        assert_eq!(analysis.currency, Currency::Idr);
    }

    #[test]
    fn grand_total_is_additive() {
        let entries = vec![
            entry("a", Niche::Fitness, 10_000, 100_000.0),
            entry("b", Niche::Finance, 55_555, 2_500.0),
        ];
        let results = run(&entries);
        let analysis = summarize(&results, &entries).unwrap();

        assert_eq!(analysis.grand_total, results[0].revenue.amount + results[1].revenue.amount);
        assert_eq!(analysis.sales_per_month, results[0].buyers + results[1].buyers);
        // product price echoes the first entry only
        assert_eq!(analysis.product_price, "Rp100.000");
    }

    #[test]
    fn zero_audience_conversion_is_zero() {
        let entries = vec![entry("a", Niche::Fitness, 0, 10.0)];
        let analysis = summarize(&run(&entries), &entries).unwrap();
        assert_eq!(analysis.conversion, 0.0);
        assert_eq!(analysis.revenue_per_month, "Rp0");
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let entries = vec![entry("a", Niche::Fitness, 100, 1.0), entry("b", Niche::Fitness, 100, 1.0)];
        let results = run(&entries[..1]);

        let err = summarize(&results, &entries).unwrap_err();
        assert!(matches!(err, EngineError::MismatchedInput { results: 1, entries: 2, .. }));
    }

    #[test]
    fn order_mismatch_is_rejected() {
        let entries = vec![entry("a", Niche::Fitness, 100, 1.0), entry("b", Niche::Tech, 100, 1.0)];
        let mut results = run(&entries);
        results.reverse();

        assert!(matches!(
            summarize(&results, &entries),
            Err(EngineError::MismatchedInput { .. })
        ));
    }

    #[test]
    fn empty_batch_is_invalid() {
        let err = summarize(&[], &[]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "entries"));
    }

    #[test]
    fn mixed_currencies_are_invalid() {
        let mut usd = entry("b", Niche::Fitness, 100, 1.0);
        usd.pricing.currency = Currency::Usd;
        let entries = vec![entry("a", Niche::Fitness, 100, 1.0), usd];

        let err = summarize(&run(&entries), &entries).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "pricing"));
    }

    #[test]
    fn audience_total_overflow_is_invalid() {
        // funnel results at rate 0 are all-zero, only the audience sum can overflow
        let entries: Vec<SweetSpotEntry> =
            (0..3).map(|i| entry(&format!("e{i}"), Niche::Fitness, i64::MAX as u64, 1.0)).collect();
        let results: Vec<SweetSpotResult> = entries
            .iter()
            .map(|e| SweetSpotResult {
                niche: e.niche.clone(),
                engaged_audience: 0,
                interested_audience: 0,
                buyers: 0,
                revenue: Money::zero(Currency::Idr),
            })
            .collect();

        let err = summarize(&results, &entries).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "audience"));
    }

    #[test]
    fn buyer_total_overflow_is_invalid() {
        let entries = vec![entry("a", Niche::Fitness, 1, 0.0), entry("b", Niche::Fitness, 1, 0.0)];
        let mut results = run(&entries);
        results[0].buyers = u64::MAX;
        results[1].buyers = 1;

        let err = summarize(&results, &entries).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "buyers"));
    }

    #[test]
    fn infinite_grand_total_is_invalid() {
        let entries = vec![entry("a", Niche::Fitness, 10, 1.0), entry("b", Niche::Fitness, 10, 1.0)];
        let mut results = run(&entries);
        results[0].revenue.amount = f64::MAX;
        results[1].revenue.amount = f64::MAX;

        let err = summarize(&results, &entries).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "pricing"));
    }

    #[test]
    fn ranking_rejects_mixed_currencies() {
        let mut usd = entry("usd", Niche::Food, 10_000, 100.0);
        usd.pricing.currency = Currency::Usd;
        let entries = vec![entry("idr", Niche::Food, 10_000, 100_000.0), usd];

        let err = rank_sweet_spots(&run(&entries), &entries).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "pricing"));
        assert!(rank_sweet_spots(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn groups_by_niche_name() {
        let entries = vec![
            entry("a", Niche::Tech, 10_000, 10.0),
            entry("b", Niche::Beauty, 10_000, 20.0),
            entry("c", Niche::Tech, 20_000, 10.0),
        ];
        let groups = summarize_by_niche(&run(&entries), &entries).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].niche, Niche::Beauty);
        assert_eq!(groups[0].entries, 1);
        assert_eq!(groups[1].niche, Niche::Tech);
        assert_eq!(groups[1].entries, 2);
        assert_eq!(groups[1].analysis.sales_per_month, 60 + 120);
    }

    #[test]
    fn ranking_orders_by_revenue_per_follower() {
        let entries = vec![
            entry("low", Niche::Food, 10_000, 1_000.0),
            entry("high", Niche::Food, 10_000, 50_000.0),
            entry("none", Niche::Food, 0, 50_000.0),
            entry("also-high", Niche::Food, 10_000, 50_000.0),
        ];
        let ranking = rank_sweet_spots(&run(&entries), &entries).unwrap();

        let ids: Vec<&str> = ranking.iter().map(|r| r.entry_id.as_str()).collect();
        assert_eq!(ids, ["also-high", "high", "low", "none"]);
        assert_eq!(ranking[1].revenue_per_follower, 300.0);
        assert_eq!(ranking[3].revenue_per_follower, 0.0);
    }
}
