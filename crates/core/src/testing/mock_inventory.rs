//! Mock inventory for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::inventory::{
    CollectionMetadata, CollectionRef, InventoryCollaborator, InventoryError, InventoryItem,
    InventorySnapshot,
};

/// A recorded membership or metadata call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Trait method name, e.g. "add_to_collection".
    pub operation: &'static str,
    pub collection: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone)]
struct MockCollection {
    library: String,
    name: String,
    members: Vec<String>,
    metadata: Option<CollectionMetadata>,
    artwork: Option<Vec<u8>>,
}

/// Mock implementation of the InventoryCollaborator trait.
///
/// Holds one snapshot per library and an in-memory set of collections.
/// Membership calls touching an item registered with `fail_item` fail as a
/// whole, so batches containing it fall back to per-item calls.
///
/// # Example
///
/// ```rust,ignore
/// use curator_core::testing::{fixtures, MockInventory};
///
/// let inventory = MockInventory::new();
/// inventory.set_snapshot(fixtures::snapshot("Movies", "g1", vec![
///     fixtures::inventory_movie("m1", "Heat", 1995, 949),
/// ])).await;
/// let handle = inventory.add_collection("Movies", "Best", &["m1"]).await;
/// ```
pub struct MockInventory {
    snapshots: Arc<RwLock<HashMap<String, InventorySnapshot>>>,
    collections: Arc<RwLock<HashMap<String, MockCollection>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<InventoryError>>>,
    failing_items: Arc<RwLock<HashMap<String, InventoryError>>>,
    snapshot_count: Arc<RwLock<usize>>,
}

impl std::fmt::Debug for MockInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockInventory")
            .field("snapshots", &"<snapshots>")
            .field("collections", &"<collections>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl Default for MockInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInventory {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(HashMap::new())),
            collections: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failing_items: Arc::new(RwLock::new(HashMap::new())),
            snapshot_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Replace the snapshot served for the snapshot's library.
    pub async fn set_snapshot(&self, snapshot: InventorySnapshot) {
        self.snapshots
            .write()
            .await
            .insert(snapshot.library.clone(), snapshot);
    }

    /// Add an item to a library and move it to a new generation.
    pub async fn add_item(&self, library: &str, generation: &str, item: InventoryItem) {
        let mut snapshots = self.snapshots.write().await;
        let snapshot = snapshots
            .entry(library.to_string())
            .or_insert_with(|| InventorySnapshot::new(library, generation, Vec::new()));
        snapshot.items.push(item);
        snapshot.generation = generation.to_string();
    }

    /// Create a collection with existing members. Returns its handle.
    pub async fn add_collection(&self, library: &str, name: &str, members: &[&str]) -> String {
        let mut collections = self.collections.write().await;
        let handle = format!("col-{}", collections.len() + 1);
        collections.insert(
            handle.clone(),
            MockCollection {
                library: library.to_string(),
                name: name.to_string(),
                members: members.iter().map(|m| m.to_string()).collect(),
                metadata: None,
                artwork: None,
            },
        );
        handle
    }

    pub async fn collection_handle(&self, library: &str, name: &str) -> Option<String> {
        self.collections
            .read()
            .await
            .iter()
            .find(|(_, c)| c.library == library && c.name == name)
            .map(|(handle, _)| handle.clone())
    }

    pub async fn members(&self, collection: &str) -> Vec<String> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }

    pub async fn metadata(&self, collection: &str) -> Option<CollectionMetadata> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|c| c.metadata.clone())
    }

    pub async fn artwork(&self, collection: &str) -> Option<Vec<u8>> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|c| c.artwork.clone())
    }

    pub async fn set_next_error(&self, error: InventoryError) {
        *self.next_error.write().await = Some(error);
    }

    /// Fail every membership call that includes `handle`.
    pub async fn fail_item(&self, handle: &str, error: InventoryError) {
        self.failing_items
            .write()
            .await
            .insert(handle.to_string(), error);
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of successful snapshot reads.
    pub async fn snapshot_count(&self) -> usize {
        *self.snapshot_count.read().await
    }

    async fn take_error(&self) -> Option<InventoryError> {
        self.next_error.write().await.take()
    }

    async fn check_items(&self, items: &[String]) -> Result<(), InventoryError> {
        let failing = self.failing_items.read().await;
        match items.iter().find_map(|item| failing.get(item)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn record(&self, operation: &'static str, collection: &str, items: &[String]) {
        self.calls.write().await.push(RecordedCall {
            operation,
            collection: collection.to_string(),
            items: items.to_vec(),
        });
    }
}

#[async_trait]
impl InventoryCollaborator for MockInventory {
    fn name(&self) -> &str {
        "mock"
    }

    async fn snapshot(&self, library: &str) -> Result<InventorySnapshot, InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        let snapshot = self
            .snapshots
            .read()
            .await
            .get(library)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("library {}", library)))?;
        *self.snapshot_count.write().await += 1;
        Ok(snapshot)
    }

    async fn find_collection(
        &self,
        library: &str,
        name: &str,
    ) -> Result<Option<CollectionRef>, InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        Ok(self
            .collection_handle(library, name)
            .await
            .map(|handle| CollectionRef {
                handle,
                name: name.to_string(),
                created: false,
            }))
    }

    async fn find_or_create_collection(
        &self,
        library: &str,
        name: &str,
    ) -> Result<CollectionRef, InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        if let Some(handle) = self.collection_handle(library, name).await {
            return Ok(CollectionRef {
                handle,
                name: name.to_string(),
                created: false,
            });
        }
        let handle = self.add_collection(library, name, &[]).await;
        self.record("create_collection", &handle, &[]).await;
        Ok(CollectionRef {
            handle,
            name: name.to_string(),
            created: true,
        })
    }

    async fn collection_members(&self, collection: &str) -> Result<Vec<String>, InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.members.clone())
            .ok_or_else(|| InventoryError::NotFound(format!("collection {}", collection)))
    }

    async fn add_to_collection(
        &self,
        collection: &str,
        items: &[String],
    ) -> Result<(), InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.check_items(items).await?;

        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| InventoryError::NotFound(format!("collection {}", collection)))?;
        for item in items {
            if !entry.members.contains(item) {
                entry.members.push(item.clone());
            }
        }
        drop(collections);

        self.record("add_to_collection", collection, items).await;
        Ok(())
    }

    async fn remove_from_collection(
        &self,
        collection: &str,
        items: &[String],
    ) -> Result<(), InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.check_items(items).await?;

        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| InventoryError::NotFound(format!("collection {}", collection)))?;
        entry.members.retain(|m| !items.contains(m));
        drop(collections);

        self.record("remove_from_collection", collection, items).await;
        Ok(())
    }

    async fn update_metadata(
        &self,
        collection: &str,
        metadata: &CollectionMetadata,
    ) -> Result<(), InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| InventoryError::NotFound(format!("collection {}", collection)))?;
        entry.metadata = Some(metadata.clone());
        drop(collections);

        self.record("update_metadata", collection, &[]).await;
        Ok(())
    }

    async fn upload_artwork(&self, collection: &str, image: &[u8]) -> Result<(), InventoryError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| InventoryError::NotFound(format!("collection {}", collection)))?;
        entry.artwork = Some(image.to_vec());
        drop(collections);

        self.record("upload_artwork", collection, &[]).await;
        Ok(())
    }
}
