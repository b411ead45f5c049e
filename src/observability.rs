use std::net::SocketAddr;

use crate::alloc::Denial;
use crate::model::Slot;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total slot requests. Labels: outcome.
pub const REQUESTS_TOTAL: &str = "slotd_requests_total";

/// Histogram: slot request latency in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "slotd_request_duration_seconds";

// ── Background loop metrics ─────────────────────────────────────

/// Counter: quota reset loop firings.
pub const QUOTA_RESETS_TOTAL: &str = "slotd_quota_resets_total";

/// Histogram: client entries dropped per quota reset.
pub const QUOTA_ENTRIES_CLEARED: &str = "slotd_quota_entries_cleared";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a request outcome to a short label for metrics.
pub fn outcome_label(result: &Result<Slot, Denial>) -> &'static str {
    match result {
        Ok(_) => "assigned",
        Err(Denial::RateLimited { .. }) => "rate_limited",
        Err(Denial::Exhausted) => "exhausted",
    }
}
