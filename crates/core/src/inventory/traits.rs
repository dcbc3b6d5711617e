//! Trait definitions for the inventory module.

use async_trait::async_trait;

use super::error::InventoryError;
use super::types::{CollectionMetadata, CollectionRef, InventorySnapshot};

/// The external media library.
#[async_trait]
pub trait InventoryCollaborator: Send + Sync {
    /// Returns the name of this inventory implementation.
    fn name(&self) -> &str;

    /// Read-only snapshot of a library with its generation id.
    async fn snapshot(&self, library: &str) -> Result<InventorySnapshot, InventoryError>;

    /// Look up a collection by name in `library` without creating it.
    async fn find_collection(
        &self,
        library: &str,
        name: &str,
    ) -> Result<Option<CollectionRef>, InventoryError>;

    /// Look up a collection by name in `library`, creating it when absent.
    async fn find_or_create_collection(
        &self,
        library: &str,
        name: &str,
    ) -> Result<CollectionRef, InventoryError>;

    /// Item handles currently in the collection.
    async fn collection_members(&self, collection: &str) -> Result<Vec<String>, InventoryError>;

    async fn add_to_collection(
        &self,
        collection: &str,
        items: &[String],
    ) -> Result<(), InventoryError>;

    async fn remove_from_collection(
        &self,
        collection: &str,
        items: &[String],
    ) -> Result<(), InventoryError>;

    /// Set summary, sort title, display order and visibility.
    async fn update_metadata(
        &self,
        collection: &str,
        metadata: &CollectionMetadata,
    ) -> Result<(), InventoryError>;

    async fn upload_artwork(&self, collection: &str, image: &[u8]) -> Result<(), InventoryError>;
}
