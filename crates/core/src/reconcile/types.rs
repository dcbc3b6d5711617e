//! Types for reconciliation diffs and their application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::acquisition::AcquisitionError;
use crate::inventory::{InventoryError, InventoryItem};
use crate::source::CandidateItem;

/// Change set that makes a collection's membership match its desired items.
///
/// `to_add` and `to_remove` are disjoint. A member that is still desired is
/// in neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationDiff {
    /// Items to add, in collection order.
    pub to_add: Vec<InventoryItem>,
    /// Member handles to remove. Always empty in append mode.
    pub to_remove: Vec<String>,
    /// Unmatched candidates eligible for acquisition.
    pub missing: Vec<CandidateItem>,
}

impl ReconciliationDiff {
    /// No membership change. Missing candidates are not membership changes.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn add_handles(&self) -> Vec<String> {
        self.to_add.iter().map(|i| i.handle.clone()).collect()
    }
}

/// A side-effecting call that failed while applying a diff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("Collection '{collection}': failed to add '{item}': {error}")]
    Add {
        collection: String,
        item: String,
        #[source]
        error: InventoryError,
    },

    #[error("Collection '{collection}': failed to remove '{item}': {error}")]
    Remove {
        collection: String,
        item: String,
        #[source]
        error: InventoryError,
    },

    #[error("Collection '{collection}': acquisition of '{candidate}' failed: {error}")]
    Acquire {
        collection: String,
        candidate: String,
        #[source]
        error: AcquisitionError,
    },

    #[error("Collection '{collection}': {operation} failed: {error}")]
    Collection {
        collection: String,
        operation: &'static str,
        #[source]
        error: InventoryError,
    },

    #[error("Collection '{collection}': cannot read poster '{path}': {message}")]
    Poster {
        collection: String,
        path: String,
        message: String,
    },
}

impl ApplyError {
    /// Operation label used for metrics.
    pub fn operation(&self) -> &'static str {
        match self {
            ApplyError::Add { .. } => "add",
            ApplyError::Remove { .. } => "remove",
            ApplyError::Acquire { .. } => "acquire",
            ApplyError::Collection { operation, .. } => *operation,
            ApplyError::Poster { .. } => "artwork",
        }
    }
}

/// What applying a diff actually achieved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// Handles added to the collection.
    pub added: Vec<String>,
    /// Handles removed from the collection.
    pub removed: Vec<String>,
    /// Candidates handed to an acquisition collaborator.
    pub requested: Vec<CandidateItem>,
    /// Candidates the acquisition service already tracked.
    pub already_requested: Vec<CandidateItem>,
    /// Unmatched candidates nobody was asked to acquire.
    pub unresolved: Vec<CandidateItem>,
    pub errors: Vec<ApplyError>,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.requested.is_empty()
    }
}
