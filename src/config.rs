use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::types::{Currency, Niche, SweetSpotAssumption};

/// Assumption refresh interval (seconds) — how often the registry is reloaded
/// from the assumptions table.
pub const ASSUMPTION_REFRESH_INTERVAL_SECS: u64 = 300;

/// SQLite pool size.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Rates seeded into an empty assumptions table on first start:
/// `(niche, engagement, conversion, buyer)`.
pub const DEFAULT_ASSUMPTIONS: &[(&str, f64, f64, f64)] = &[
    ("fitness", 0.30, 0.20, 0.10),
    ("finance", 0.15, 0.25, 0.12),
    ("beauty", 0.35, 0.15, 0.08),
    ("gaming", 0.40, 0.10, 0.05),
    ("education", 0.20, 0.30, 0.15),
    ("food", 0.35, 0.12, 0.06),
    ("travel", 0.25, 0.10, 0.04),
    ("tech", 0.20, 0.20, 0.10),
    ("lifestyle", 0.30, 0.10, 0.05),
];

pub fn default_assumptions() -> Vec<SweetSpotAssumption> {
    DEFAULT_ASSUMPTIONS
        .iter()
        .map(|&(niche, engagement_rate, conversion_rate, buyer_rate)| SweetSpotAssumption {
            niche: Niche::from(niche),
            engagement_rate,
            conversion_rate,
            buyer_rate,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Optional JSON array of assumptions upserted at startup (ASSUMPTIONS_PATH)
    pub assumptions_path: Option<PathBuf>,
    /// Registry reload interval in seconds (ASSUMPTION_REFRESH_SECS)
    pub assumption_refresh_secs: u64,
    /// Currency for submissions that omit one (DEFAULT_CURRENCY)
    pub default_currency: Currency,
    /// Niche whose rates stand in for unregistered niches (FALLBACK_NICHE).
    /// Unset means unknown niches are rejected.
    pub fallback_niche: Option<Niche>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: var("DB_PATH").unwrap_or_else(|| "sweetspot.db".to_string()),
            api_port: var("API_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            assumptions_path: var("ASSUMPTIONS_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            assumption_refresh_secs: match var("ASSUMPTION_REFRESH_SECS") {
                Some(s) => s
                    .parse::<u64>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| {
                        AppError::Config("ASSUMPTION_REFRESH_SECS must be a positive integer".to_string())
                    })?,
                None => ASSUMPTION_REFRESH_INTERVAL_SECS,
            },
            default_currency: var("DEFAULT_CURRENCY")
                .unwrap_or_else(|| "IDR".to_string())
                .parse::<Currency>()
                .map_err(|e| AppError::Config(format!("DEFAULT_CURRENCY: {e}")))?,
            fallback_niche: var("FALLBACK_NICHE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(Niche::from),
        })
    }
}
