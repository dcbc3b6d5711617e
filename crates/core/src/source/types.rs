//! Candidate records and the discovery collaborator contract.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collection::SourceDirective;
use crate::matcher::normalize_title;
use crate::media::{ExternalId, ExternalIds, MediaKind};

/// A discovery-source record in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub title: String,
    pub year: Option<u32>,
    pub kind: MediaKind,
    #[serde(default)]
    pub ids: ExternalIds,
    pub release_date: Option<NaiveDate>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    /// ISO 639-1 code, lowercase.
    pub original_language: Option<String>,
    /// ISO 3166-1 code, lowercase.
    pub origin_country: Option<String>,
    /// Genre ids. `None` when the source did not report genres.
    pub genres: Option<Vec<u32>>,
}

impl CandidateItem {
    pub fn new(title: &str, year: Option<u32>, kind: MediaKind) -> Self {
        Self {
            title: title.to_string(),
            year,
            kind,
            ids: ExternalIds::default(),
            release_date: None,
            vote_average: None,
            vote_count: None,
            original_language: None,
            origin_country: None,
            genres: None,
        }
    }

    pub fn with_ids(mut self, ids: ExternalIds) -> Self {
        self.ids = ids;
        self
    }

    /// Stable identity: kind plus best identifier, else normalized title and year.
    pub fn key(&self) -> CandidateKey {
        let identity = match self.ids.best() {
            Some(id) => CandidateIdentity::Id(id),
            None => CandidateIdentity::Title {
                normalized: normalize_title(&self.title),
                year: self.year,
            },
        };
        CandidateKey {
            kind: self.kind,
            identity,
        }
    }

    /// "Title (Year)" for logs and notifications.
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandidateIdentity {
    Id(ExternalId),
    Title {
        normalized: String,
        year: Option<u32>,
    },
}

/// Key used for de-duplication and for the match cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateKey {
    pub kind: MediaKind,
    pub identity: CandidateIdentity,
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            CandidateIdentity::Id(id) => write!(f, "{}:{}", self.kind, id),
            CandidateIdentity::Title {
                normalized,
                year: Some(year),
            } => write!(f, "{}:title:{}|{}", self.kind, normalized, year),
            CandidateIdentity::Title {
                normalized,
                year: None,
            } => write!(f, "{}:title:{}|", self.kind, normalized),
        }
    }
}

/// Failure reported by a discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// A source that degraded while resolving one collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Collection '{collection}': source '{directive}' unavailable: {message}")]
    Unavailable {
        collection: String,
        directive: String,
        message: String,
    },

    #[error("Collection '{collection}': source '{directive}' rate limited: {message}")]
    RateLimited {
        collection: String,
        directive: String,
        message: String,
    },

    #[error("Collection '{collection}': source '{directive}' rejected parameters: {message}")]
    InvalidParameters {
        collection: String,
        directive: String,
        message: String,
    },

    #[error("Collection '{collection}': source '{directive}' is not supported")]
    Unsupported {
        collection: String,
        directive: String,
    },
}

impl SourceError {
    pub(crate) fn from_discovery(collection: &str, directive: &str, error: DiscoveryError) -> Self {
        let collection = collection.to_string();
        let directive = directive.to_string();
        match error {
            DiscoveryError::Unavailable(message) => SourceError::Unavailable {
                collection,
                directive,
                message,
            },
            DiscoveryError::RateLimited(message) => SourceError::RateLimited {
                collection,
                directive,
                message,
            },
            DiscoveryError::InvalidParameters(message) => SourceError::InvalidParameters {
                collection,
                directive,
                message,
            },
        }
    }

    /// Directive key the error is attributed to.
    pub fn directive(&self) -> &str {
        match self {
            SourceError::Unavailable { directive, .. }
            | SourceError::RateLimited { directive, .. }
            | SourceError::InvalidParameters { directive, .. }
            | SourceError::Unsupported { directive, .. } => directive,
        }
    }
}

/// Content-discovery provider.
#[async_trait]
pub trait DiscoveryCollaborator: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Fetch up to `limit` candidates of `kind` for one directive.
    async fn fetch(
        &self,
        directive: &SourceDirective,
        kind: MediaKind,
        limit: u32,
    ) -> Result<Vec<CandidateItem>, DiscoveryError>;
}

/// Candidates for one collection plus the sources that degraded.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// De-duplicated candidates in source order.
    pub candidates: Vec<CandidateItem>,
    pub errors: Vec<SourceError>,
    /// Items returned by collaborators before de-duplication.
    pub fetched: usize,
}
