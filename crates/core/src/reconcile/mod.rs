//! Reconciliation: diffing desired items against collection membership and
//! applying the result through the external collaborators.

mod apply;
mod diff;
mod ordering;
mod types;

pub use apply::apply_diff;
pub use diff::reconcile;
pub use ordering::order_items;
pub use types::{ApplyError, ReconciliationDiff, SyncOutcome};
