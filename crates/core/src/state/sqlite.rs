//! SQLite-backed state store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{StateError, StateStore};
use crate::matcher::{CachedMatch, MatchCache};

/// SQLite-backed state store.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open the state database, creating the file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StateError> {
        let conn = Connection::open(path).map_err(|e| StateError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing state database; a missing file is left uncreated.
    pub fn open_existing(path: &Path) -> Result<Option<Self>, StateError> {
        if !path.exists() {
            debug!("No state database at {:?}", path);
            return Ok(None);
        }
        Self::new(path).map(Some)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StateError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StateError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StateError> {
        conn.execute_batch(
            r#"
            -- Generation each library's cache was computed against
            CREATE TABLE IF NOT EXISTS match_cache_generation (
                library TEXT PRIMARY KEY,
                generation TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );

            -- Flat candidate key -> resolution mapping
            CREATE TABLE IF NOT EXISTS match_cache (
                library TEXT NOT NULL,
                candidate_key TEXT NOT NULL,
                resolution TEXT NOT NULL,
                PRIMARY KEY (library, candidate_key)
            );

            CREATE TABLE IF NOT EXISTS collection_runs (
                library TEXT NOT NULL,
                collection TEXT NOT NULL,
                last_run_at TEXT NOT NULL,
                PRIMARY KEY (library, collection)
            );

            CREATE TABLE IF NOT EXISTS collection_artwork (
                library TEXT NOT NULL,
                collection TEXT NOT NULL,
                digest TEXT NOT NULL,
                PRIMARY KEY (library, collection)
            );
            "#,
        )
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StateError> {
        self.conn
            .lock()
            .map_err(|_| StateError::Database("state connection lock poisoned".to_string()))
    }
}

impl StateStore for SqliteStateStore {
    fn load_cache(&self, library: &str) -> Result<MatchCache, StateError> {
        let conn = self.conn()?;

        let generation: Option<String> = conn
            .query_row(
                "SELECT generation FROM match_cache_generation WHERE library = ?",
                params![library],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StateError::Database(e.to_string()))?;

        let Some(generation) = generation else {
            return Ok(MatchCache::new());
        };

        let mut stmt = conn
            .prepare("SELECT candidate_key, resolution FROM match_cache WHERE library = ?")
            .map_err(|e| StateError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![library], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| StateError::Database(e.to_string()))?;

        let mut entries = HashMap::new();
        for row in rows {
            let (key, json) = row.map_err(|e| StateError::Database(e.to_string()))?;
            let entry: CachedMatch =
                serde_json::from_str(&json).map_err(|e| StateError::Corrupt {
                    key: key.clone(),
                    message: e.to_string(),
                })?;
            entries.insert(key, entry);
        }

        debug!(
            "Loaded {} cached matches for '{}' (generation {})",
            entries.len(),
            library,
            generation
        );
        Ok(MatchCache::from_entries(&generation, entries))
    }

    fn save_cache(&self, library: &str, cache: &MatchCache) -> Result<(), StateError> {
        let Some(generation) = cache.generation() else {
            return Ok(());
        };

        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StateError::Database(e.to_string()))?;

        tx.execute("DELETE FROM match_cache WHERE library = ?", params![library])
            .map_err(|e| StateError::Database(e.to_string()))?;
        tx.execute(
            "INSERT OR REPLACE INTO match_cache_generation (library, generation, saved_at)
             VALUES (?, ?, ?)",
            params![library, generation, Utc::now().to_rfc3339()],
        )
        .map_err(|e| StateError::Database(e.to_string()))?;

        for (key, entry) in cache.entries() {
            let json = serde_json::to_string(entry).map_err(|e| StateError::Corrupt {
                key: key.clone(),
                message: e.to_string(),
            })?;
            tx.execute(
                "INSERT INTO match_cache (library, candidate_key, resolution) VALUES (?, ?, ?)",
                params![library, key, json],
            )
            .map_err(|e| StateError::Database(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(())
    }

    fn last_run(
        &self,
        library: &str,
        collection: &str,
    ) -> Result<Option<DateTime<Utc>>, StateError> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT last_run_at FROM collection_runs WHERE library = ? AND collection = ?",
                params![library, collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StateError::Database(e.to_string()))?;

        value
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| StateError::Corrupt {
                        key: format!("{}/{}", library, collection),
                        message: e.to_string(),
                    })
            })
            .transpose()
    }

    fn record_run(
        &self,
        library: &str,
        collection: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StateError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO collection_runs (library, collection, last_run_at)
             VALUES (?, ?, ?)",
            params![library, collection, at.to_rfc3339()],
        )
        .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(())
    }

    fn artwork_digest(
        &self,
        library: &str,
        collection: &str,
    ) -> Result<Option<String>, StateError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT digest FROM collection_artwork WHERE library = ? AND collection = ?",
            params![library, collection],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StateError::Database(e.to_string()))
    }

    fn set_artwork_digest(
        &self,
        library: &str,
        collection: &str,
        digest: &str,
    ) -> Result<(), StateError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO collection_artwork (library, collection, digest)
             VALUES (?, ?, ?)",
            params![library, collection, digest],
        )
        .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(())
    }
}
