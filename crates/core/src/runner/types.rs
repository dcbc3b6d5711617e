//! Types for reconciliation runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notify::RunSummary;

/// Errors that prevent a run from starting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// Another run on the same runner is in progress.
    #[error("A run is already in progress")]
    AlreadyRunning,
}

/// Final state of one collection within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    /// Membership changed or acquisitions were requested.
    Changed,
    Unchanged,
    /// Dry run: the diff was computed but not applied.
    Planned,
    /// Schedule says the collection is not due.
    NotDue,
    /// Fewer matches than `minimum_items`.
    BelowMinimum,
    /// The collection could not be reconciled at all.
    Failed,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Changed => "changed",
            CollectionStatus::Unchanged => "unchanged",
            CollectionStatus::Planned => "planned",
            CollectionStatus::NotDue => "not_due",
            CollectionStatus::BelowMinimum => "below_minimum",
            CollectionStatus::Failed => "failed",
        }
    }

    /// Whether the collection was skipped without reaching the inventory.
    pub fn is_skipped(&self) -> bool {
        matches!(self, CollectionStatus::NotDue | CollectionStatus::BelowMinimum)
    }
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub library: String,
    pub collection: String,
    pub status: CollectionStatus,
    /// De-duplicated candidates from all sources.
    pub candidates: usize,
    /// Candidates left after filters and the collection limit.
    pub kept: usize,
    pub matched: usize,
    /// Added items; planned additions in a dry run.
    pub added: usize,
    /// Removed items; planned removals in a dry run.
    pub removed: usize,
    pub requested: usize,
    /// Unmatched candidates nobody was asked to acquire.
    pub unresolved: usize,
    /// Degraded sources and failed calls, each naming the collection.
    pub errors: Vec<String>,
}

impl CollectionReport {
    pub fn new(library: &str, collection: &str, status: CollectionStatus) -> Self {
        Self {
            library: library.to_string(),
            collection: collection.to_string(),
            status,
            candidates: 0,
            kept: 0,
            matched: 0,
            added: 0,
            removed: 0,
            requested: 0,
            unresolved: 0,
            errors: Vec::new(),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The run stopped at a collection boundary before finishing.
    pub cancelled: bool,
    pub collections: Vec<CollectionReport>,
}

impl RunReport {
    pub fn collection(&self, library: &str, name: &str) -> Option<&CollectionReport> {
        self.collections
            .iter()
            .find(|c| c.library == library && c.collection == name)
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            collections: self.collections.len(),
            ..Default::default()
        };
        for report in &self.collections {
            match report.status {
                CollectionStatus::Changed => summary.changed += 1,
                CollectionStatus::Failed => summary.failed += 1,
                status if status.is_skipped() => summary.skipped += 1,
                _ => {}
            }
            summary.added += report.added;
            summary.removed += report.removed;
            summary.requested += report.requested;
        }
        summary
    }

    /// Every error of the run, in collection order.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.collections
            .iter()
            .flat_map(|c| c.errors.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut changed = CollectionReport::new("Movies", "A", CollectionStatus::Changed);
        changed.added = 3;
        changed.removed = 1;
        let mut failed = CollectionReport::new("Movies", "B", CollectionStatus::Failed);
        failed.errors.push("Collection 'B': boom".into());
        let report = RunReport {
            run_id: "r".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
            collections: vec![
                changed,
                failed,
                CollectionReport::new("Movies", "C", CollectionStatus::NotDue),
                CollectionReport::new("Movies", "D", CollectionStatus::Planned),
            ],
        };

        let summary = report.summary();
        assert_eq!(summary.collections, 4);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.added, 3);
        assert_eq!(summary.removed, 1);
        assert_eq!(report.errors().count(), 1);
        assert!(report.collection("Movies", "C").is_some());
    }
}
