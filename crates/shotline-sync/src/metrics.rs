//! Sync metrics.
//!
//! - Request counters and latency by operation and status
//! - Retry counters
//! - Debounced save outcomes and pending videos

use metrics::{counter, gauge, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Persistence HTTP requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "shotline_sync_requests_total";

    /// Persistence request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "shotline_sync_latency_seconds";

    /// Retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "shotline_sync_retries_total";

    /// Debounced saves by outcome.
    pub const SAVES_TOTAL: &str = "shotline_sync_saves_total";

    /// Videos waiting for a save.
    pub const PENDING_VIDEOS: &str = "shotline_sync_pending_videos";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed persistence request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record the outcome of one debounced save (`ok` or `failed`).
pub fn record_save(outcome: &str) {
    counter!(
        names::SAVES_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn set_pending_videos(count: usize) {
    gauge!(names::PENDING_VIDEOS).set(count as f64);
}
