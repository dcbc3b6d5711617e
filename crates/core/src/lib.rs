pub mod acquisition;
pub mod collection;
pub mod config;
pub mod filter;
pub mod inventory;
pub mod matcher;
pub mod media;
pub mod metrics;
pub mod notify;
pub mod reconcile;
pub mod runner;
pub mod source;
pub mod state;
pub mod testing;

pub use acquisition::{AcquisitionCollaborator, AcquisitionError, AcquisitionRegistry};
pub use collection::{
    load_collection_tree, parse_collection_tree, CollectionSpec, ConfigError, ConfigIssue,
    LibrarySpec, ParsedConfig,
};
pub use config::{
    load_settings, load_settings_from_str, validate_settings, Settings, SettingsError,
};
pub use filter::{apply_filters, apply_limit, FilterReport};
pub use inventory::{InventoryCollaborator, InventoryError, InventoryItem, InventorySnapshot};
pub use matcher::{match_all, update_cache, InventoryIndex, MatchCache, MatchOutcome, MatchResult};
pub use media::{ExternalId, ExternalIds, MediaKind};
pub use notify::{Notifier, NotifyError, NotifyEvent};
pub use reconcile::{apply_diff, reconcile, ApplyError, ReconciliationDiff, SyncOutcome};
pub use runner::{CollectionReport, CollectionRunner, CollectionStatus, RunError, RunHandle, RunReport};
pub use source::{
    CandidateItem, DiscoveryCollaborator, DiscoveryError, DiscoveryRegistry, SourceError,
    SourceResolver,
};
pub use state::{SqliteStateStore, StateError, StateStore};
