//! Post-fetch predicate filtering of candidates.
//!
//! Every configured filter is ANDed. A candidate that lacks a field a
//! configured filter needs is excluded.

use std::fmt;

use tracing::debug;

use crate::collection::FilterSpec;
use crate::source::CandidateItem;

/// Why a candidate was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The candidate lacks the field the filter compares.
    Missing(&'static str),
    /// A numeric or date bound was not met.
    OutOfRange(&'static str),
    /// An inclusion set was not matched or an exclusion set was.
    Excluded(&'static str),
}

impl Rejection {
    /// Filter key responsible for the rejection.
    pub fn key(&self) -> &'static str {
        match self {
            Rejection::Missing(key) | Rejection::OutOfRange(key) | Rejection::Excluded(key) => key,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Missing(key) => write!(f, "{}: field unknown", key),
            Rejection::OutOfRange(key) => write!(f, "{}: out of range", key),
            Rejection::Excluded(key) => write!(f, "{}: excluded", key),
        }
    }
}

/// Result of filtering one collection's candidates.
#[derive(Debug, Clone, Default)]
pub struct FilterReport {
    pub kept: Vec<CandidateItem>,
    pub rejected: Vec<(CandidateItem, Rejection)>,
    /// Configured keys that were not understood and had no effect.
    pub ignored_keys: Vec<String>,
}

/// Apply `filters` to `candidates`, preserving order.
pub fn apply_filters(candidates: Vec<CandidateItem>, filters: &FilterSpec) -> FilterReport {
    let mut report = FilterReport {
        ignored_keys: filters.unknown_keys.clone(),
        ..Default::default()
    };

    for candidate in candidates {
        match check(&candidate, filters) {
            Ok(()) => report.kept.push(candidate),
            Err(rejection) => {
                debug!("Filtered out '{}': {}", candidate.display_title(), rejection);
                report.rejected.push((candidate, rejection));
            }
        }
    }

    report
}

/// Truncate to the collection limit, if any.
pub fn apply_limit(mut candidates: Vec<CandidateItem>, limit: Option<u32>) -> Vec<CandidateItem> {
    if let Some(limit) = limit {
        candidates.truncate(limit as usize);
    }
    candidates
}

/// Evaluate every configured filter against one candidate.
pub fn check(candidate: &CandidateItem, filters: &FilterSpec) -> Result<(), Rejection> {
    at_least("year.gte", filters.year_gte, candidate.year)?;
    at_most("year.lte", filters.year_lte, candidate.year)?;
    at_least(
        "vote_average.gte",
        filters.vote_average_gte,
        candidate.vote_average,
    )?;
    at_most(
        "vote_average.lte",
        filters.vote_average_lte,
        candidate.vote_average,
    )?;
    at_least(
        "tmdb_vote_count.gte",
        filters.vote_count_gte,
        candidate.vote_count,
    )?;
    // Sources expose a single rating; critic thresholds compare against it.
    at_least(
        "critic_rating.gte",
        filters.critic_rating_gte,
        candidate.vote_average,
    )?;
    at_least(
        "release_date.gte",
        filters.release_date_gte,
        candidate.release_date,
    )?;
    at_most(
        "release_date.lte",
        filters.release_date_lte,
        candidate.release_date,
    )?;

    if !filters.with_genres.is_empty() {
        let genres = candidate
            .genres
            .as_ref()
            .ok_or(Rejection::Missing("with_genres"))?;
        if !filters.with_genres.iter().any(|g| genres.contains(g)) {
            return Err(Rejection::Excluded("with_genres"));
        }
    }
    if !filters.without_genres.is_empty() {
        let genres = candidate
            .genres
            .as_ref()
            .ok_or(Rejection::Missing("without_genres"))?;
        if filters.without_genres.iter().any(|g| genres.contains(g)) {
            return Err(Rejection::Excluded("without_genres"));
        }
    }

    in_set(
        "original_language",
        &filters.original_language,
        candidate.original_language.as_deref(),
        true,
    )?;
    in_set(
        "original_language.not",
        &filters.original_language_not,
        candidate.original_language.as_deref(),
        false,
    )?;
    in_set(
        "origin_country.not",
        &filters.origin_country_not,
        candidate.origin_country.as_deref(),
        false,
    )?;

    Ok(())
}

fn at_least<T: PartialOrd>(
    key: &'static str,
    bound: Option<T>,
    value: Option<T>,
) -> Result<(), Rejection> {
    let Some(bound) = bound else {
        return Ok(());
    };
    match value {
        None => Err(Rejection::Missing(key)),
        Some(v) if v < bound => Err(Rejection::OutOfRange(key)),
        Some(_) => Ok(()),
    }
}

fn at_most<T: PartialOrd>(
    key: &'static str,
    bound: Option<T>,
    value: Option<T>,
) -> Result<(), Rejection> {
    let Some(bound) = bound else {
        return Ok(());
    };
    match value {
        None => Err(Rejection::Missing(key)),
        Some(v) if v > bound => Err(Rejection::OutOfRange(key)),
        Some(_) => Ok(()),
    }
}

/// Set membership (`include`) or negated membership over lowercase codes.
fn in_set(
    key: &'static str,
    set: &[String],
    value: Option<&str>,
    include: bool,
) -> Result<(), Rejection> {
    if set.is_empty() {
        return Ok(());
    }
    let value = value
        .map(|v| v.trim().to_lowercase())
        .ok_or(Rejection::Missing(key))?;
    if set.iter().any(|s| *s == value) == include {
        Ok(())
    } else {
        Err(Rejection::Excluded(key))
    }
}
