//! Metrics for check-in resolution and clone synchronization.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `series_pass_checkins_total{outcome}` - Check-in attempts by outcome (succeeded, failed, deferred)
//! - `series_pass_uncheckins_total{outcome}` - Un-check-in attempts by outcome
//! - `series_pass_checkin_failures_total{kind}` - Resolution failures by error kind
//! - `series_pass_clones_created_total{provider}` - Attendee clones materialized
//! - `series_pass_sync_propagations_total{kind}` - Writes mirrored between attendees and clones
//!
//! Without an installed recorder every call is a no-op.

use crate::resolution::CheckinOutcome;
use metrics::describe_counter;

/// Initialize and register all metric descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_checkin_metrics() {
    describe_counter!(
        "series_pass_checkins_total",
        "Total number of series pass check-in attempts by outcome (succeeded, failed, deferred)"
    );
    describe_counter!(
        "series_pass_uncheckins_total",
        "Total number of series pass un-check-in attempts by outcome (succeeded, failed, deferred)"
    );
    describe_counter!(
        "series_pass_checkin_failures_total",
        "Total number of check-in resolution failures by error kind"
    );
    describe_counter!(
        "series_pass_clones_created_total",
        "Total number of per-occurrence attendee clones created"
    );
    describe_counter!(
        "series_pass_sync_propagations_total",
        "Total number of writes mirrored between attendees and their clones, by change kind"
    );

    tracing::info!("Check-in metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record the outcome of a check-in attempt.
pub fn record_checkin(outcome: CheckinOutcome) {
    metrics::counter!("series_pass_checkins_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record the outcome of an un-check-in attempt.
pub fn record_uncheckin(outcome: CheckinOutcome) {
    metrics::counter!("series_pass_uncheckins_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a resolution failure.
///
/// # Arguments
///
/// * `kind` - Stable error label, see [`crate::CheckinError::kind`]
pub fn record_failure(kind: &'static str) {
    metrics::counter!("series_pass_checkin_failures_total", "kind" => kind).increment(1);
}

/// Record a materialized clone.
pub fn record_clone_created(provider: &str) {
    metrics::counter!("series_pass_clones_created_total", "provider" => provider.to_string())
        .increment(1);
}

/// Record writes mirrored by the sync engine.
///
/// # Arguments
///
/// * `kind` - Notification name of the mirrored change
/// * `targets` - Number of records written
pub fn record_sync_propagation(kind: &'static str, targets: usize) {
    metrics::counter!("series_pass_sync_propagations_total", "kind" => kind)
        .increment(u64::try_from(targets).unwrap_or(u64::MAX));
}
