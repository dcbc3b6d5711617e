//! Process settings: where the collection tree lives, where state is kept and
//! how reconciliation behaves.

mod loader;
mod types;
mod validate;

pub use loader::{load_settings, load_settings_from_str};
pub use types::*;
pub use validate::validate_settings;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse settings: {0}")]
    ParseError(String),

    #[error("Settings validation failed: {0}")]
    ValidationError(String),
}
