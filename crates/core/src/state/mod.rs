//! Persisted run state: the match cache, per-collection last-run
//! timestamps and artwork digests.
//!
//! The match cache is stored per library as a flat key to resolution
//! mapping together with the inventory generation it was computed against.

mod sqlite;

pub use sqlite::SqliteStateStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::matcher::MatchCache;

/// Errors for state storage operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt state entry '{key}': {message}")]
    Corrupt { key: String, message: String },
}

/// Storage for state carried between runs.
pub trait StateStore: Send + Sync {
    /// Load the match cache persisted for `library`. Empty when none exists.
    fn load_cache(&self, library: &str) -> Result<MatchCache, StateError>;

    /// Replace the persisted match cache of `library`.
    fn save_cache(&self, library: &str, cache: &MatchCache) -> Result<(), StateError>;

    /// When the collection was last reconciled.
    fn last_run(&self, library: &str, collection: &str)
        -> Result<Option<DateTime<Utc>>, StateError>;

    fn record_run(
        &self,
        library: &str,
        collection: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StateError>;

    /// SHA-256 of the artwork last uploaded for the collection.
    fn artwork_digest(&self, library: &str, collection: &str)
        -> Result<Option<String>, StateError>;

    fn set_artwork_digest(
        &self,
        library: &str,
        collection: &str,
        digest: &str,
    ) -> Result<(), StateError>;
}
