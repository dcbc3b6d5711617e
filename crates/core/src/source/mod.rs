//! Source resolution: invoking discovery collaborators for a collection's
//! directives and normalizing their results into one candidate sequence.

mod dedup;
mod registry;
mod resolver;
mod types;

pub use dedup::deduplicate_candidates;
pub use registry::DiscoveryRegistry;
pub use resolver::{fetch_limit, SourceResolver};
pub use types::*;
