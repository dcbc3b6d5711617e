//! Collection tree parsing: root config, collection files, templates,
//! builder directives and schedules.

mod directive;
mod parser;
mod schedule;
mod template;
mod types;

pub use directive::{normalize_directive, DirectiveValueError};
pub use parser::{
    load_collection_tree, parse_collection_tree, referenced_files, ConfigIssue, ParsedConfig,
};
pub use schedule::{fires_on, is_due, parse_schedule};
pub use template::{merge_into, substitute, TemplateRegistry, MAX_TEMPLATE_DEPTH};
pub use types::*;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Library '{library}': collection file '{path}' not found")]
    MissingFile { library: String, path: String },

    #[error("Failed to read '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Invalid YAML in '{document}': {message}")]
    Yaml { document: String, message: String },

    #[error("Collection '{collection}': template chain does not terminate ({chain})")]
    CyclicTemplate { collection: String, chain: String },

    #[error("Collection '{collection}': unknown template '{template}'")]
    UnknownTemplate { collection: String, template: String },

    #[error("Collection '{collection}': unrecognized schedule '{value}'")]
    BadSchedule { collection: String, value: String },

    #[error("Collection '{collection}': invalid '{field}': {message}")]
    InvalidField {
        collection: String,
        field: String,
        message: String,
    },
}

impl ConfigError {
    /// Collection the error is attributed to, if any.
    pub fn collection(&self) -> Option<&str> {
        match self {
            ConfigError::CyclicTemplate { collection, .. }
            | ConfigError::UnknownTemplate { collection, .. }
            | ConfigError::BadSchedule { collection, .. }
            | ConfigError::InvalidField { collection, .. } => Some(collection),
            _ => None,
        }
    }
}
