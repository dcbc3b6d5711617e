use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Settings, SettingsError};

/// Load settings from file with environment variable overrides
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        return Err(SettingsError::FileNotFound(path.display().to_string()));
    }

    let settings: Settings = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("CURATOR_").split("__"))
        .extract()
        .map_err(|e| SettingsError::ParseError(e.to_string()))?;

    Ok(settings)
}

/// Load settings from TOML string (useful for testing)
pub fn load_settings_from_str(toml_str: &str) -> Result<Settings, SettingsError> {
    toml::from_str(toml_str).map_err(|e| SettingsError::ParseError(e.to_string()))
}
