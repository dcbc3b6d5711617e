//! Generation-scoped match cache.
//!
//! Entries are valid only for the inventory snapshot generation they were
//! computed against. Moving to another generation drops every entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{MatchOutcome, MatchResult, MatchTier};

/// A stored resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedMatch {
    pub outcome: MatchOutcome,
    pub tier: Option<MatchTier>,
}

/// Hit and miss counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MatchCache {
    generation: Option<String>,
    entries: HashMap<String, CachedMatch>,
    hits: usize,
    misses: usize,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore persisted entries computed against `generation`.
    pub fn from_entries(generation: &str, entries: HashMap<String, CachedMatch>) -> Self {
        Self {
            generation: Some(generation.to_string()),
            entries,
            ..Default::default()
        }
    }

    pub fn generation(&self) -> Option<&str> {
        self.generation.as_deref()
    }

    /// Scope the cache to `generation`, dropping entries from any other one.
    ///
    /// Returns `true` when entries were invalidated.
    pub fn ensure_generation(&mut self, generation: &str) -> bool {
        if self.generation.as_deref() == Some(generation) {
            return false;
        }
        let dropped = self.entries.len();
        self.entries.clear();
        self.generation = Some(generation.to_string());
        if dropped > 0 {
            debug!(
                "Match cache invalidated: {} entries dropped for generation {}",
                dropped, generation
            );
        }
        dropped > 0
    }

    /// Look up a candidate key, counting the hit or miss.
    pub fn get(&mut self, key: &str) -> Option<&CachedMatch> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: String, entry: CachedMatch) {
        self.entries.insert(key, entry);
    }

    /// Store freshly computed results. Cached results are skipped.
    pub fn update(&mut self, results: &[MatchResult]) {
        for result in results.iter().filter(|r| !r.cached) {
            self.insert(
                result.candidate.key().to_string(),
                CachedMatch {
                    outcome: result.outcome.clone(),
                    tier: result.tier,
                },
            );
        }
    }

    pub fn entries(&self) -> &HashMap<String, CachedMatch> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_change_invalidates() {
        let mut cache = MatchCache::new();
        assert!(!cache.ensure_generation("g1"));
        cache.insert(
            "movie:tmdb:603".into(),
            CachedMatch {
                outcome: MatchOutcome::Unmatched,
                tier: None,
            },
        );

        assert!(!cache.ensure_generation("g1"));
        assert_eq!(cache.len(), 1);

        assert!(cache.ensure_generation("g2"));
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), Some("g2"));
    }

    #[test]
    fn test_hit_and_miss_counted() {
        let mut cache = MatchCache::from_entries(
            "g1",
            HashMap::from([(
                "movie:tmdb:1".to_string(),
                CachedMatch {
                    outcome: MatchOutcome::Unmatched,
                    tier: None,
                },
            )]),
        );
        assert!(cache.get("movie:tmdb:1").is_some());
        assert!(cache.get("movie:tmdb:2").is_none());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }
}
