//! Metrics emitted through the `metrics` facade.
//!
//! Nothing here installs a recorder; embedders that want the numbers install
//! one (Prometheus exporter, etc.) before running an analysis.

use std::time::Duration;

use metrics::{counter, histogram};

/// Timed operations (one per aggregate query plus the whole pipeline).
pub const OPERATIONS_TOTAL: &str = "txt_wrapped_operations_total";
/// Duration of timed operations in seconds.
pub const OPERATION_DURATION: &str = "txt_wrapped_operation_duration_seconds";
/// Completed pipeline runs by status.
pub const PIPELINE_RUNS_TOTAL: &str = "txt_wrapped_pipeline_runs_total";
/// Message texts scanned by the per-correspondent pass.
pub const MESSAGES_SCANNED_TOTAL: &str = "txt_wrapped_messages_scanned_total";
/// Message texts skipped because they could not be decoded.
pub const MESSAGES_SKIPPED_TOTAL: &str = "txt_wrapped_messages_skipped_total";

const fn status(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

/// Record one timed operation
pub fn record_operation(operation: &'static str, duration: Duration, success: bool) {
    counter!(OPERATIONS_TOTAL, "operation" => operation, "status" => status(success)).increment(1);
    histogram!(OPERATION_DURATION, "operation" => operation).record(duration.as_secs_f64());
}

/// Record the outcome of a full pipeline run
pub fn record_pipeline_run(success: bool) {
    counter!(PIPELINE_RUNS_TOTAL, "status" => status(success)).increment(1);
}

/// Record messages visited by the per-correspondent pass
pub fn record_messages_scanned(scanned: u64, skipped: u64) {
    counter!(MESSAGES_SCANNED_TOTAL).increment(scanned);
    if skipped > 0 {
        counter!(MESSAGES_SKIPPED_TOTAL).increment(skipped);
    }
}
