//! Testing utilities and mock implementations of the collaborator traits.
//!
//! Lets the whole reconciliation pipeline run without a real library,
//! discovery service or acquisition service.
//!
//! # Example
//!
//! ```rust,ignore
//! use curator_core::testing::{fixtures, MockDiscovery, MockInventory};
//!
//! let tmdb = MockDiscovery::new("tmdb");
//! tmdb.set_default_results(vec![fixtures::movie("Heat", 1995, 949)]).await;
//!
//! let inventory = MockInventory::new();
//! inventory.set_snapshot(fixtures::snapshot("Movies", "g1", vec![])).await;
//! ```

mod mock_acquisition;
mod mock_discovery;
mod mock_inventory;
mod mock_notifier;

pub use mock_acquisition::{MockAcquisition, RecordedRequest};
pub use mock_discovery::{MockDiscovery, RecordedFetch};
pub use mock_inventory::{MockInventory, RecordedCall};
pub use mock_notifier::MockNotifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::inventory::{InventoryItem, InventorySnapshot};
    use crate::media::{ExternalIds, MediaKind};
    use crate::source::CandidateItem;

    /// A movie candidate identified by TMDB id.
    pub fn movie(title: &str, year: u32, tmdb: u32) -> CandidateItem {
        CandidateItem::new(title, Some(year), MediaKind::Movie).with_ids(ExternalIds::tmdb(tmdb))
    }

    /// A series candidate identified by TVDB id.
    pub fn series(title: &str, year: u32, tvdb: u32) -> CandidateItem {
        CandidateItem::new(title, Some(year), MediaKind::Series).with_ids(ExternalIds {
            tvdb: Some(tvdb),
            ..Default::default()
        })
    }

    /// A candidate carrying no identifiers, matchable by title only.
    pub fn untagged(title: &str, year: u32, kind: MediaKind) -> CandidateItem {
        CandidateItem::new(title, Some(year), kind)
    }

    /// A movie candidate with the metadata filters look at.
    pub fn rated_movie(
        title: &str,
        year: u32,
        tmdb: u32,
        vote_average: f32,
        vote_count: u32,
        language: &str,
    ) -> CandidateItem {
        let mut candidate = movie(title, year, tmdb);
        candidate.vote_average = Some(vote_average);
        candidate.vote_count = Some(vote_count);
        candidate.original_language = Some(language.to_string());
        candidate
    }

    /// A library movie with a TMDB id.
    pub fn inventory_movie(handle: &str, title: &str, year: u32, tmdb: u32) -> InventoryItem {
        InventoryItem::new(handle, title, Some(year), MediaKind::Movie)
            .with_ids(ExternalIds::tmdb(tmdb))
    }

    /// A library series with a TVDB id.
    pub fn inventory_series(handle: &str, title: &str, year: u32, tvdb: u32) -> InventoryItem {
        InventoryItem::new(handle, title, Some(year), MediaKind::Series).with_ids(ExternalIds {
            tvdb: Some(tvdb),
            ..Default::default()
        })
    }

    pub fn snapshot(library: &str, generation: &str, items: Vec<InventoryItem>) -> InventorySnapshot {
        InventorySnapshot::new(library, generation, items)
    }
}
