//! Run driver: processes every configured collection sequentially and
//! reports per-collection outcomes.

mod run;
mod types;

pub use run::{CollectionRunner, RunHandle};
pub use types::{CollectionReport, CollectionStatus, RunError, RunReport};
