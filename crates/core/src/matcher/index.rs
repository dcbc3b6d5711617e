//! Lookup index over an inventory snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::inventory::{InventoryItem, InventorySnapshot};
use crate::media::{ExternalId, MediaKind};
use crate::source::CandidateItem;

use super::normalize_title;
use super::types::{MatchOutcome, MatchTier};

type TitleKey = (MediaKind, String, Option<u32>);

/// Identifier and title indexes over one snapshot.
#[derive(Debug)]
pub struct InventoryIndex {
    snapshot: InventorySnapshot,
    by_id: HashMap<(MediaKind, ExternalId), usize>,
    by_title: HashMap<TitleKey, Vec<usize>>,
    lookups: AtomicUsize,
}

impl InventoryIndex {
    pub fn new(snapshot: InventorySnapshot) -> Self {
        let mut by_id = HashMap::new();
        let mut by_title: HashMap<TitleKey, Vec<usize>> = HashMap::new();

        for (position, item) in snapshot.items.iter().enumerate() {
            for id in item.ids.all() {
                by_id.entry((item.kind, id)).or_insert(position);
            }
            let title = normalize_title(&item.title);
            if !title.is_empty() {
                by_title
                    .entry((item.kind, title, item.year))
                    .or_default()
                    .push(position);
            }
        }

        Self {
            snapshot,
            by_id,
            by_title,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn generation(&self) -> &str {
        &self.snapshot.generation
    }

    pub fn snapshot(&self) -> &InventorySnapshot {
        &self.snapshot
    }

    /// Number of candidates resolved against the index so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Run the tiers in order for one candidate.
    pub fn resolve(&self, candidate: &CandidateItem) -> (MatchOutcome, Option<MatchTier>) {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        for id in candidate.ids.all() {
            if let Some(&position) = self.by_id.get(&(candidate.kind, id)) {
                return (
                    MatchOutcome::Matched(self.snapshot.items[position].clone()),
                    Some(MatchTier::Identifier),
                );
            }
        }

        let title = normalize_title(&candidate.title);
        if title.is_empty() {
            return (MatchOutcome::Unmatched, None);
        }
        match self.by_title.get(&(candidate.kind, title, candidate.year)) {
            Some(positions) if positions.len() == 1 => (
                MatchOutcome::Matched(self.snapshot.items[positions[0]].clone()),
                Some(MatchTier::Title),
            ),
            Some(positions) if positions.len() > 1 => {
                let items: Vec<InventoryItem> = positions
                    .iter()
                    .map(|&p| self.snapshot.items[p].clone())
                    .collect();
                (MatchOutcome::Ambiguous(items), Some(MatchTier::Title))
            }
            _ => (MatchOutcome::Unmatched, None),
        }
    }
}
