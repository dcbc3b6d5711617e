//! Prometheus metrics for the reconciliation pipeline.
//!
//! This module provides metrics for:
//! - Source resolution (fetches per provider, candidates per collection)
//! - Identity matching (outcomes by tier, cache hits)
//! - Reconciliation (membership changes, apply failures, acquisition requests)
//! - Runs (collections processed, run duration)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Source Resolution
// =============================================================================

/// Discovery fetches by provider and result.
pub static SOURCE_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_source_fetches_total", "Total discovery fetches"),
        &["provider", "result"], // "ok", "unavailable", "rate_limited", "invalid", "timeout"
    )
    .unwrap()
});

/// Discovery fetch duration in seconds.
pub static SOURCE_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "curator_source_fetch_duration_seconds",
            "Duration of discovery fetches",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["provider"],
    )
    .unwrap()
});

/// Candidates per collection after de-duplication.
pub static CANDIDATES_RESOLVED: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "curator_candidates_resolved",
            "Number of de-duplicated candidates per collection",
        )
        .buckets(vec![0.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Identity Matching
// =============================================================================

/// Match outcomes by tier.
pub static MATCH_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_match_outcomes_total", "Identity match outcomes"),
        &["tier", "outcome"], // tier: "identifier", "title", "none"
    )
    .unwrap()
});

/// Match cache lookups by result.
pub static MATCH_CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_match_cache_lookups_total", "Match cache lookups"),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// Reconciliation
// =============================================================================

/// Collection membership changes applied.
pub static MEMBERSHIP_CHANGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_membership_changes_total",
            "Items added to or removed from collections",
        ),
        &["action"], // "added", "removed"
    )
    .unwrap()
});

/// Per-item apply failures by operation.
pub static APPLY_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_apply_failures_total", "Failed side-effecting calls"),
        &["operation"], // "add", "remove", "acquire", "metadata", "artwork"
    )
    .unwrap()
});

/// Acquisition requests by media kind and result.
pub static ACQUISITION_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_acquisition_requests_total",
            "Acquisition requests for unmatched candidates",
        ),
        &["kind", "result"], // "requested", "already_requested", "failed"
    )
    .unwrap()
});

// =============================================================================
// Runs
// =============================================================================

/// Collections processed by final status.
pub static COLLECTIONS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_collections_processed_total",
            "Collections processed by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("curator_run_duration_seconds", "Duration of a full run")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["result"], // "completed", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sources
        Box::new(SOURCE_FETCHES.clone()),
        Box::new(SOURCE_FETCH_DURATION.clone()),
        Box::new(CANDIDATES_RESOLVED.clone()),
        // Matching
        Box::new(MATCH_OUTCOMES.clone()),
        Box::new(MATCH_CACHE_LOOKUPS.clone()),
        // Reconciliation
        Box::new(MEMBERSHIP_CHANGES.clone()),
        Box::new(APPLY_FAILURES.clone()),
        Box::new(ACQUISITION_REQUESTS.clone()),
        // Runs
        Box::new(COLLECTIONS_PROCESSED.clone()),
        Box::new(RUN_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        MEMBERSHIP_CHANGES.with_label_values(&["added"]).inc_by(2);
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "curator_membership_changes_total"));
    }
}
