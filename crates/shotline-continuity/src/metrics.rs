//! Continuity engine metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Engine operations by operation and outcome.
    pub const OPS_TOTAL: &str = "shotline_continuity_ops_total";

    /// Groups changed by shot re-validation.
    pub const REVALIDATED_GROUPS_TOTAL: &str = "shotline_continuity_revalidated_groups_total";
}

/// Record one engine operation.
///
/// `outcome` is `applied`, `unchanged` or an error code.
pub fn record_operation(operation: &str, outcome: &str) {
    counter!(
        names::OPS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_revalidated(groups: usize) {
    if groups > 0 {
        counter!(names::REVALIDATED_GROUPS_TOTAL).increment(groups as u64);
    }
}
