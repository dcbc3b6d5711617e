//! Mock discovery collaborator for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::collection::SourceDirective;
use crate::media::MediaKind;
use crate::source::{CandidateItem, DiscoveryCollaborator, DiscoveryError};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub directive: SourceDirective,
    pub kind: MediaKind,
    /// Limit the resolver asked for.
    pub limit: u32,
}

/// Mock implementation of the DiscoveryCollaborator trait.
///
/// Returns the results configured for a directive key, falling back to the
/// default results. Results are truncated to the requested limit.
///
/// # Example
///
/// ```rust,ignore
/// use curator_core::testing::{fixtures, MockDiscovery};
///
/// let tmdb = MockDiscovery::new("tmdb");
/// tmdb.set_default_results(vec![fixtures::movie("Heat", 1995, 949)]).await;
/// tmdb.set_results("tmdb_popular", vec![]).await;
/// ```
pub struct MockDiscovery {
    name: String,
    default_results: Arc<RwLock<Vec<CandidateItem>>>,
    /// Results keyed by directive key.
    results: Arc<RwLock<HashMap<String, Vec<CandidateItem>>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<DiscoveryError>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl std::fmt::Debug for MockDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDiscovery")
            .field("name", &self.name)
            .field("results", &"<results>")
            .field("fetches", &"<fetches>")
            .finish()
    }
}

impl MockDiscovery {
    /// Create a new mock returning nothing.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_results: Arc::new(RwLock::new(Vec::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Results for any directive without its own configured results.
    pub async fn set_default_results(&self, results: Vec<CandidateItem>) {
        *self.default_results.write().await = results;
    }

    /// Results for one directive key, e.g. "tmdb_popular".
    pub async fn set_results(&self, directive_key: &str, results: Vec<CandidateItem>) {
        self.results
            .write()
            .await
            .insert(directive_key.to_string(), results);
    }

    /// Make the next fetch fail.
    pub async fn set_next_error(&self, error: DiscoveryError) {
        *self.next_error.write().await = Some(error);
    }

    /// Sleep before answering each fetch.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    async fn take_error(&self) -> Option<DiscoveryError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl DiscoveryCollaborator for MockDiscovery {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        directive: &SourceDirective,
        kind: MediaKind,
        limit: u32,
    ) -> Result<Vec<CandidateItem>, DiscoveryError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.fetches.write().await.push(RecordedFetch {
            directive: directive.clone(),
            kind,
            limit,
        });

        let keyed = self.results.read().await.get(directive.kind.key()).cloned();
        let mut results = match keyed {
            Some(results) => results,
            None => self.default_results.read().await.clone(),
        };
        results.truncate(limit as usize);
        Ok(results)
    }
}
