//! Metrics instrumentation for kea-dns.
//!
//! All metrics are prefixed with `kea_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: std::time::Duration) {
    let result_str = match result {
        QueryResult::Success => "success",
        QueryResult::NxDomain => "nxdomain",
        QueryResult::Unsupported => "unsupported",
        QueryResult::Error => "error",
    };

    counter!("kea_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("kea_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryResult {
    /// Query returned records successfully.
    Success,
    /// No active lease matched the question.
    NxDomain,
    /// Record type outside the supported set.
    Unsupported,
    /// Lease store lookup failed.
    Error,
}

/// Record the number of answers returned for a successful lookup.
pub fn record_answers_returned(count: usize) {
    histogram!("kea_dns.query.answers_returned").record(count as f64);
}

/// Record a lease-store round trip.
pub fn record_store_query(operation: &'static str, duration: std::time::Duration) {
    histogram!("kea_dns.store.query.duration.seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record connection pool occupancy (call periodically).
pub fn record_pool_state(connections: usize, idle: usize) {
    gauge!("kea_dns.store.pool.connections").set(connections as f64);
    gauge!("kea_dns.store.pool.idle").set(idle as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
