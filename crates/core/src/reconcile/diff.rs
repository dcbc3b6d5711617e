//! Add/remove diff between matched items and current membership.

use std::collections::HashSet;

use crate::collection::{CollectionOrder, SyncMode};
use crate::inventory::InventoryItem;
use crate::matcher::MatchResult;

use super::ordering::order_items;
use super::ReconciliationDiff;

/// Compute the diff for one collection.
///
/// Desired items are the matched inventory items, de-duplicated by handle and
/// ordered by `order`. In append mode nothing is ever removed. Ambiguous
/// results contribute nothing.
pub fn reconcile(
    results: &[MatchResult],
    current_membership: &[String],
    sync_mode: SyncMode,
    order: CollectionOrder,
) -> ReconciliationDiff {
    let mut seen = HashSet::new();
    let desired: Vec<InventoryItem> = results
        .iter()
        .filter_map(MatchResult::matched)
        .filter(|item| seen.insert(item.handle.clone()))
        .cloned()
        .collect();
    let desired = order_items(desired, order);

    let current: HashSet<&str> = current_membership.iter().map(String::as_str).collect();
    let to_add = desired
        .iter()
        .filter(|item| !current.contains(item.handle.as_str()))
        .cloned()
        .collect();

    let to_remove = match sync_mode {
        SyncMode::Append => Vec::new(),
        SyncMode::Sync => {
            let wanted: HashSet<&str> = desired.iter().map(|i| i.handle.as_str()).collect();
            let mut removed = HashSet::new();
            current_membership
                .iter()
                .filter(|h| !wanted.contains(h.as_str()))
                .filter(|h| removed.insert(h.as_str()))
                .cloned()
                .collect()
        }
    };

    let missing = results
        .iter()
        .filter(|r| r.is_unmatched())
        .map(|r| r.candidate.clone())
        .collect();

    ReconciliationDiff {
        to_add,
        to_remove,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatchOutcome, MatchTier};
    use crate::media::MediaKind;
    use crate::source::CandidateItem;

    fn matched(handle: &str, title: &str) -> MatchResult {
        MatchResult {
            candidate: CandidateItem::new(title, Some(2000), MediaKind::Movie),
            outcome: MatchOutcome::Matched(InventoryItem::new(
                handle,
                title,
                Some(2000),
                MediaKind::Movie,
            )),
            tier: Some(MatchTier::Title),
            cached: false,
        }
    }

    fn unmatched(title: &str) -> MatchResult {
        MatchResult {
            candidate: CandidateItem::new(title, Some(2000), MediaKind::Movie),
            outcome: MatchOutcome::Unmatched,
            tier: None,
            cached: false,
        }
    }

    fn members(handles: &[&str]) -> Vec<String> {
        handles.iter().map(|h| h.to_string()).collect()
    }

    fn apply(membership: &[String], diff: &ReconciliationDiff) -> Vec<String> {
        let mut next: Vec<String> = membership
            .iter()
            .filter(|h| !diff.to_remove.contains(h))
            .cloned()
            .collect();
        next.extend(diff.add_handles());
        next
    }

    #[test]
    fn test_sync_adds_and_removes() {
        let results = vec![matched("a", "A"), matched("b", "B"), unmatched("C")];
        let diff = reconcile(
            &results,
            &members(&["b", "x"]),
            SyncMode::Sync,
            CollectionOrder::Custom,
        );
        assert_eq!(diff.add_handles(), vec!["a"]);
        assert_eq!(diff.to_remove, vec!["x"]);
        assert_eq!(diff.missing.len(), 1);
        assert_eq!(diff.missing[0].title, "C");
    }

    #[test]
    fn test_append_never_removes() {
        let results = vec![matched("a", "A")];
        for membership in [members(&[]), members(&["x", "y"]), members(&["a", "z"])] {
            let diff = reconcile(&results, &membership, SyncMode::Append, CollectionOrder::Custom);
            assert!(diff.to_remove.is_empty());
        }
        let diff = reconcile(&[], &members(&["x"]), SyncMode::Append, CollectionOrder::Custom);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_add_and_remove_disjoint() {
        let results = vec![matched("a", "A"), matched("b", "B"), matched("a", "A again")];
        for mode in [SyncMode::Sync, SyncMode::Append] {
            let diff = reconcile(
                &results,
                &members(&["a", "c", "c"]),
                mode,
                CollectionOrder::Custom,
            );
            for item in &diff.to_add {
                assert!(!diff.to_remove.contains(&item.handle));
            }
            assert_eq!(diff.add_handles(), vec!["b"]);
        }
    }

    #[test]
    fn test_second_pass_is_empty() {
        let results = vec![matched("a", "A"), matched("b", "B")];
        for mode in [SyncMode::Sync, SyncMode::Append] {
            let membership = members(&["b", "x"]);
            let first = reconcile(&results, &membership, mode, CollectionOrder::Custom);
            let membership = apply(&membership, &first);
            let second = reconcile(&results, &membership, mode, CollectionOrder::Custom);
            assert!(second.is_empty());
            assert!(second.missing.is_empty());
        }
    }

    #[test]
    fn test_ambiguous_contributes_nothing() {
        let ambiguous = MatchResult {
            candidate: CandidateItem::new("Dune", Some(2021), MediaKind::Movie),
            outcome: MatchOutcome::Ambiguous(vec![]),
            tier: Some(MatchTier::Title),
            cached: false,
        };
        let diff = reconcile(&[ambiguous], &[], SyncMode::Sync, CollectionOrder::Custom);
        assert!(diff.is_empty());
        assert!(diff.missing.is_empty());
    }

    #[test]
    fn test_adds_follow_collection_order() {
        let results = vec![matched("z", "Zodiac"), matched("a", "Alien")];
        let diff = reconcile(&results, &[], SyncMode::Sync, CollectionOrder::SortName);
        assert_eq!(diff.add_handles(), vec!["a", "z"]);
    }
}
