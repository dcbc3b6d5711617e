//! Acquisition collaborators: services asked to obtain items that a
//! collection wants but the library does not hold.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::collection::AcquisitionOptions;
use crate::media::MediaKind;
use crate::source::CandidateItem;

/// Errors reported by an acquisition collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The service already tracks the item. Not a failure.
    #[error("Already requested: {0}")]
    AlreadyRequested(String),

    /// The service cannot resolve the item's identifiers.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Acquisition service unavailable: {0}")]
    Unavailable(String),
}

/// A service that acquires missing items of one media kind.
#[async_trait]
pub trait AcquisitionCollaborator: Send + Sync {
    /// Returns the name of this collaborator.
    fn name(&self) -> &str;

    /// Ask the service to acquire `candidate`.
    async fn request_acquisition(
        &self,
        candidate: &CandidateItem,
        options: &AcquisitionOptions,
    ) -> Result<(), AcquisitionError>;
}

/// Acquisition collaborators keyed by media kind.
#[derive(Clone, Default)]
pub struct AcquisitionRegistry {
    collaborators: HashMap<MediaKind, Arc<dyn AcquisitionCollaborator>>,
}

impl std::fmt::Debug for AcquisitionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self
            .collaborators
            .iter()
            .map(|(kind, c)| format!("{}={}", kind, c.name()))
            .collect();
        f.debug_struct("AcquisitionRegistry")
            .field("collaborators", &names)
            .finish()
    }
}

impl AcquisitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: MediaKind, collaborator: Arc<dyn AcquisitionCollaborator>) {
        self.collaborators.insert(kind, collaborator);
    }

    pub fn with(mut self, kind: MediaKind, collaborator: Arc<dyn AcquisitionCollaborator>) -> Self {
        self.register(kind, collaborator);
        self
    }

    pub fn get(&self, kind: MediaKind) -> Option<&Arc<dyn AcquisitionCollaborator>> {
        self.collaborators.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.collaborators.is_empty()
    }
}
