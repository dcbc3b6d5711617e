//! Inventory collaborator contract.
//!
//! The inventory is the external media library. The core reads a snapshot
//! of its items once per library per run and requests collection membership,
//! metadata and artwork changes through [`InventoryCollaborator`]; it never
//! mutates inventory records itself.

mod error;
mod traits;
mod types;

pub use error::InventoryError;
pub use traits::InventoryCollaborator;
pub use types::{CollectionMetadata, CollectionRef, InventoryItem, InventorySnapshot};
