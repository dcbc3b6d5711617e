use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::Provider;

use super::DiscoveryCollaborator;

/// Discovery collaborators keyed by the provider they serve.
#[derive(Clone, Default)]
pub struct DiscoveryRegistry {
    collaborators: HashMap<Provider, Arc<dyn DiscoveryCollaborator>>,
}

impl std::fmt::Debug for DiscoveryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.collaborators.keys().collect();
        providers.sort();
        f.debug_struct("DiscoveryRegistry")
            .field("providers", &providers)
            .finish()
    }
}

impl DiscoveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collaborator, replacing any previous one for `provider`.
    pub fn register(&mut self, provider: Provider, collaborator: Arc<dyn DiscoveryCollaborator>) {
        self.collaborators.insert(provider, collaborator);
    }

    pub fn with(mut self, provider: Provider, collaborator: Arc<dyn DiscoveryCollaborator>) -> Self {
        self.register(provider, collaborator);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&Arc<dyn DiscoveryCollaborator>> {
        self.collaborators.get(&provider)
    }
}
