//! Mock acquisition collaborator for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::acquisition::{AcquisitionCollaborator, AcquisitionError};
use crate::collection::AcquisitionOptions;
use crate::source::CandidateItem;

/// A recorded acquisition request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub candidate: CandidateItem,
    pub options: AcquisitionOptions,
}

/// Mock implementation of the AcquisitionCollaborator trait.
///
/// Remembers every accepted candidate by key; asking for it again returns
/// `AlreadyRequested`, like a service that already tracks the item.
pub struct MockAcquisition {
    name: String,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    tracked: Arc<RwLock<HashSet<String>>>,
    next_error: Arc<RwLock<Option<AcquisitionError>>>,
}

impl std::fmt::Debug for MockAcquisition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAcquisition")
            .field("name", &self.name)
            .field("requests", &"<requests>")
            .finish()
    }
}

impl MockAcquisition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requests: Arc::new(RwLock::new(Vec::new())),
            tracked: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Treat the candidate with this key as already tracked.
    pub async fn mark_already_requested(&self, candidate_key: &str) {
        self.tracked.write().await.insert(candidate_key.to_string());
    }

    pub async fn set_next_error(&self, error: AcquisitionError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    async fn take_error(&self) -> Option<AcquisitionError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl AcquisitionCollaborator for MockAcquisition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request_acquisition(
        &self,
        candidate: &CandidateItem,
        options: &AcquisitionOptions,
    ) -> Result<(), AcquisitionError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.requests.write().await.push(RecordedRequest {
            candidate: candidate.clone(),
            options: options.clone(),
        });

        let key = candidate.key().to_string();
        if !self.tracked.write().await.insert(key.clone()) {
            return Err(AcquisitionError::AlreadyRequested(key));
        }
        Ok(())
    }
}
