//! Identity matching of candidates against an inventory snapshot.
//!
//! Tiers are tried in order per candidate, first success wins:
//! 1. exact external identifier (TMDb, IMDb, TVDB)
//! 2. normalized title plus exact release year
//!
//! Anything else is `Unmatched`. Several tier-2 hits make the candidate
//! `Ambiguous`; it is discarded with a warning.

mod cache;
mod index;
mod normalize;
mod types;

pub use cache::{CacheStats, CachedMatch, MatchCache};
pub use index::InventoryIndex;
pub use normalize::normalize_title;
pub use types::{MatchError, MatchOutcome, MatchResult, MatchTier};

use tracing::{debug, warn};

use crate::metrics::{MATCH_CACHE_LOOKUPS, MATCH_OUTCOMES};
use crate::source::CandidateItem;

/// Resolve every candidate, reading through `cache`.
///
/// The cache is scoped to the index's generation first. Fresh results are not
/// written back; call [`update_cache`] with the returned results.
pub fn match_all(
    candidates: &[CandidateItem],
    index: &InventoryIndex,
    cache: &mut MatchCache,
) -> Vec<MatchResult> {
    cache.ensure_generation(index.generation());

    candidates
        .iter()
        .map(|candidate| {
            let key = candidate.key().to_string();
            let result = match cache.get(&key) {
                Some(entry) => {
                    MATCH_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                    MatchResult {
                        candidate: candidate.clone(),
                        outcome: entry.outcome.clone(),
                        tier: entry.tier,
                        cached: true,
                    }
                }
                None => {
                    MATCH_CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                    let (outcome, tier) = index.resolve(candidate);
                    MatchResult {
                        candidate: candidate.clone(),
                        outcome,
                        tier,
                        cached: false,
                    }
                }
            };

            MATCH_OUTCOMES
                .with_label_values(&[
                    result.tier.map(|t| t.as_str()).unwrap_or("none"),
                    result.outcome.label(),
                ])
                .inc();
            if let Some(error) = result.error() {
                warn!("{}", error);
            } else {
                debug!(
                    "Candidate '{}' ({}): {}{}",
                    candidate.display_title(),
                    key,
                    result.outcome.label(),
                    if result.cached { " (cached)" } else { "" }
                );
            }
            result
        })
        .collect()
}

/// Write freshly computed results into the cache.
pub fn update_cache(cache: &mut MatchCache, results: &[MatchResult]) {
    cache.update(results);
}
