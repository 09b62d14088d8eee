//! Shared health state for the /health endpoint.
//! Updated by the bootstrap and the AssumptionRefresher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Default)]
pub struct HealthState {
    /// Nanosecond timestamp of the last successful registry load (0 = never).
    pub last_refresh_at_ns: AtomicU64,
    /// Niches registered after the last successful load.
    pub assumption_count: AtomicU64,
    /// Failed refresh attempts since startup.
    pub refresh_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh(&self, count: usize) {
        let now_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.last_refresh_at_ns.store(now_ns, Ordering::Relaxed);
        self.assumption_count.store(count as u64, Ordering::Relaxed);
    }

    pub fn inc_refresh_failures(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_refresh_at_ns(&self) -> u64 {
        self.last_refresh_at_ns.load(Ordering::Relaxed)
    }

    pub fn assumption_count(&self) -> u64 {
        self.assumption_count.load(Ordering::Relaxed)
    }

    pub fn refresh_failures(&self) -> u64 {
        self.refresh_failures.load(Ordering::Relaxed)
    }
}
