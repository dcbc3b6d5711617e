//! De-duplication of concatenated discovery results.

use std::collections::HashMap;

use crate::media::{ExternalId, MediaKind};

use super::{CandidateItem, CandidateKey};

/// De-duplicate candidates in source order, first occurrence wins.
///
/// Two candidates are the same item when they share any external identifier
/// of the same kind, directly or through another duplicate. Candidates
/// without identifiers fall back to normalized title plus year. Identifiers
/// only known to a later duplicate are copied onto the kept candidate.
pub fn deduplicate_candidates(raw: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let mut kept: Vec<Option<CandidateItem>> = Vec::with_capacity(raw.len());
    let mut by_id: HashMap<(MediaKind, ExternalId), usize> = HashMap::new();
    let mut by_title: HashMap<CandidateKey, usize> = HashMap::new();

    for item in raw {
        let ids = item.ids.all();

        if ids.is_empty() {
            let key = item.key();
            if by_title.contains_key(&key) {
                continue;
            }
            by_title.insert(key, kept.len());
            kept.push(Some(item));
            continue;
        }

        let mut existing: Vec<usize> = ids
            .iter()
            .filter_map(|id| by_id.get(&(item.kind, id.clone())).copied())
            .collect();
        existing.sort_unstable();
        existing.dedup();

        let Some((&survivor, absorbed)) = existing.split_first() else {
            let index = kept.len();
            for id in ids {
                by_id.insert((item.kind, id), index);
            }
            kept.push(Some(item));
            continue;
        };

        // Every earlier entry sharing an id with this item folds into the first.
        let mut merged: Vec<CandidateItem> =
            absorbed.iter().filter_map(|&index| kept[index].take()).collect();
        merged.push(item);

        if let Some(target) = kept[survivor].as_mut() {
            for other in &merged {
                for id in other.ids.all() {
                    by_id.insert((other.kind, id), survivor);
                }
                fill_missing_ids(target, other);
            }
            for id in target.ids.all() {
                by_id.insert((target.kind, id), survivor);
            }
        }
    }

    kept.into_iter().flatten().collect()
}

fn fill_missing_ids(target: &mut CandidateItem, other: &CandidateItem) {
    if target.ids.tmdb.is_none() {
        target.ids.tmdb = other.ids.tmdb;
    }
    if target.ids.imdb().is_none() {
        target.ids.imdb = other.ids.imdb().map(str::to_string);
    }
    if target.ids.tvdb.is_none() {
        target.ids.tvdb = other.ids.tvdb;
    }
}
