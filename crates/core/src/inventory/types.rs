//! Types for inventory snapshots and collection handles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::{CollectionSpec, Visibility};
use crate::media::{ExternalIds, MediaKind};

/// A record already present in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Library-internal handle used for membership operations.
    pub handle: String,
    pub title: String,
    pub year: Option<u32>,
    pub kind: MediaKind,
    #[serde(default)]
    pub ids: ExternalIds,
    pub sort_name: Option<String>,
    pub premiere_date: Option<NaiveDate>,
    pub date_created: Option<DateTime<Utc>>,
    pub community_rating: Option<f32>,
    pub critic_rating: Option<f32>,
}

impl InventoryItem {
    pub fn new(handle: &str, title: &str, year: Option<u32>, kind: MediaKind) -> Self {
        Self {
            handle: handle.to_string(),
            title: title.to_string(),
            year,
            kind,
            ids: ExternalIds::default(),
            sort_name: None,
            premiere_date: None,
            date_created: None,
            community_rating: None,
            critic_rating: None,
        }
    }

    pub fn with_ids(mut self, ids: ExternalIds) -> Self {
        self.ids = ids;
        self
    }
}

/// All items of one library at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub library: String,
    /// Changes whenever the library's contents change.
    pub generation: String,
    pub items: Vec<InventoryItem>,
}

impl InventorySnapshot {
    pub fn new(library: &str, generation: &str, items: Vec<InventoryItem>) -> Self {
        Self {
            library: library.to_string(),
            generation: generation.to_string(),
            items,
        }
    }

    pub fn item(&self, handle: &str) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.handle == handle)
    }
}

/// A collection in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub handle: String,
    pub name: String,
    /// Whether the lookup created the collection.
    pub created: bool,
}

/// Presentation settings pushed to the library for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub summary: Option<String>,
    pub sort_title: Option<String>,
    /// Display-order hint, e.g. "SortName" or "Default".
    pub display_order: String,
    pub visibility: Visibility,
}

impl CollectionMetadata {
    pub fn from_spec(spec: &CollectionSpec) -> Self {
        Self {
            summary: spec.summary.clone(),
            sort_title: spec.sort_title.clone(),
            display_order: spec.order.display_order().to_string(),
            visibility: spec.visibility,
        }
    }
}
