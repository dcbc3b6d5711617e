//! Media kinds and external identifier bags shared by candidates and
//! inventory items.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of media record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }

    /// Guess the media kind of a library from its display name.
    ///
    /// Libraries are movies unless the name mentions series/TV/shows.
    pub fn infer_from_library_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if ["film", "movie", "cinéma", "cinema"]
            .iter()
            .any(|k| lower.contains(k))
        {
            return MediaKind::Movie;
        }
        if ["série", "serie", "series", "tv", "show", "cartoon"]
            .iter()
            .any(|k| lower.contains(k))
        {
            return MediaKind::Series;
        }
        MediaKind::Movie
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scheme", content = "value", rename_all = "snake_case")]
pub enum ExternalId {
    Tmdb(u32),
    Imdb(String),
    Tvdb(u32),
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Tmdb(id) => write!(f, "tmdb:{}", id),
            ExternalId::Imdb(id) => write!(f, "imdb:{}", id),
            ExternalId::Tvdb(id) => write!(f, "tvdb:{}", id),
        }
    }
}

/// The identifiers a record is known by across providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<u32>,
}

impl ExternalIds {
    pub fn tmdb(id: u32) -> Self {
        Self {
            tmdb: Some(id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tmdb.is_none() && self.imdb().is_none() && self.tvdb.is_none()
    }

    /// IMDb id, ignoring blank values.
    pub fn imdb(&self) -> Option<&str> {
        self.imdb
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// All present identifiers in precedence order (TMDb, IMDb, TVDB).
    pub fn all(&self) -> Vec<ExternalId> {
        let mut ids = Vec::with_capacity(3);
        if let Some(id) = self.tmdb {
            ids.push(ExternalId::Tmdb(id));
        }
        if let Some(id) = self.imdb() {
            ids.push(ExternalId::Imdb(id.to_string()));
        }
        if let Some(id) = self.tvdb {
            ids.push(ExternalId::Tvdb(id));
        }
        ids
    }

    /// Highest-precedence identifier, if any.
    pub fn best(&self) -> Option<ExternalId> {
        self.all().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_prefers_tmdb() {
        let ids = ExternalIds {
            tmdb: Some(603),
            imdb: Some("tt0133093".to_string()),
            tvdb: None,
        };
        assert_eq!(ids.best(), Some(ExternalId::Tmdb(603)));
        assert_eq!(ids.all().len(), 2);
    }

    #[test]
    fn test_blank_imdb_is_ignored() {
        let ids = ExternalIds {
            tmdb: None,
            imdb: Some("  ".to_string()),
            tvdb: None,
        };
        assert!(ids.is_empty());
        assert_eq!(ids.best(), None);
    }

    #[test]
    fn test_external_id_display() {
        assert_eq!(ExternalId::Tmdb(603).to_string(), "tmdb:603");
        assert_eq!(
            ExternalId::Imdb("tt0133093".to_string()).to_string(),
            "imdb:tt0133093"
        );
    }

    #[test]
    fn test_infer_library_kind() {
        assert_eq!(MediaKind::infer_from_library_name("Films"), MediaKind::Movie);
        assert_eq!(MediaKind::infer_from_library_name("Séries"), MediaKind::Series);
        assert_eq!(MediaKind::infer_from_library_name("TV Shows"), MediaKind::Series);
        assert_eq!(MediaKind::infer_from_library_name("Kids"), MediaKind::Movie);
    }
}
