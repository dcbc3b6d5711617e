use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Directory holding `config.yml` and the collection files it references.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Directory that collection `poster` references resolve against.
    #[serde(default = "default_posters_dir")]
    pub posters_dir: PathBuf,
    #[serde(default)]
    pub state: StateSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            posters_dir: default_posters_dir(),
            state: StateSettings::default(),
            sync: SyncSettings::default(),
            discovery: DiscoverySettings::default(),
        }
    }
}

impl Settings {
    /// Path of the root collection config inside `config_dir`.
    pub fn root_config_path(&self) -> PathBuf {
        self.config_dir.join("config.yml")
    }
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

fn default_posters_dir() -> PathBuf {
    PathBuf::from("posters")
}

/// Persisted state (match cache, run timestamps, artwork digests)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateSettings {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("curator.db")
}

/// Reconciliation behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Compute and report diffs without mutating the inventory.
    #[serde(default)]
    pub dry_run: bool,
    /// Send unmatched candidates to the acquisition collaborators.
    #[serde(default = "default_true")]
    pub add_missing: bool,
    /// Treat every collection as due regardless of its schedule.
    #[serde(default)]
    pub ignore_schedule: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            add_missing: true,
            ignore_schedule: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Discovery source behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoverySettings {
    /// Upper bound on a single fetch, in seconds.
    /// A fetch that exceeds it counts as an unavailable source.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Fetch limit used when neither the directive nor the collection sets one.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Fetch a collection's directives concurrently.
    #[serde(default = "default_true")]
    pub concurrent: bool,
    /// Cap on the over-fetch multiplier applied for exclusion filters.
    #[serde(default = "default_max_multiplier")]
    pub max_limit_multiplier: f32,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            default_limit: default_limit(),
            concurrent: true,
            max_limit_multiplier: default_max_multiplier(),
        }
    }
}

impl DiscoverySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_limit() -> u32 {
    20
}

fn default_max_multiplier() -> f32 {
    4.0
}
