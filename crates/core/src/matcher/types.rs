//! Match results and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inventory::InventoryItem;
use crate::source::CandidateItem;

/// The matching strategy that produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Exact TMDb, IMDb or TVDB identifier.
    Identifier,
    /// Normalized title plus exact year.
    Title,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Identifier => "identifier",
            MatchTier::Title => "title",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "items", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched(InventoryItem),
    /// Valid candidate absent from the inventory.
    Unmatched,
    /// Several inventory items satisfy the title tier. Discarded.
    Ambiguous(Vec<InventoryItem>),
}

impl MatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MatchOutcome::Matched(_) => "matched",
            MatchOutcome::Unmatched => "unmatched",
            MatchOutcome::Ambiguous(_) => "ambiguous",
        }
    }
}

/// Resolution of one candidate against an inventory snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub candidate: CandidateItem,
    pub outcome: MatchOutcome,
    /// Tier that produced the outcome; `None` when no tier applied.
    pub tier: Option<MatchTier>,
    /// Served from the match cache.
    pub cached: bool,
}

impl MatchResult {
    pub fn matched(&self) -> Option<&InventoryItem> {
        match &self.outcome {
            MatchOutcome::Matched(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_unmatched(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Unmatched)
    }

    /// Diagnostic for outcomes that do not become a membership change.
    pub fn error(&self) -> Option<MatchError> {
        match &self.outcome {
            MatchOutcome::Ambiguous(items) => Some(MatchError::Ambiguous {
                candidate: self.candidate.display_title(),
                handles: items.iter().map(|i| i.handle.clone()).collect(),
            }),
            _ => None,
        }
    }
}

/// Non-fatal matching problems, reported per candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("'{candidate}' matches several library items: {}", .handles.join(", "))]
    Ambiguous {
        candidate: String,
        handles: Vec<String>,
    },
}
