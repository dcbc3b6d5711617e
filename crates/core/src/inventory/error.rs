//! Error types for inventory operations.

use thiserror::Error;

/// Errors reported by the inventory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Collection or item handle does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent modification or membership conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Artwork exceeds the size the service accepts.
    #[error("Artwork too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    /// The service refused the request.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The service could not be reached.
    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}
