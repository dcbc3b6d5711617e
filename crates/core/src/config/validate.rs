use super::{types::Settings, SettingsError};

/// Validate settings
/// Currently validates:
/// - Discovery timeout is not 0
/// - Default fetch limit is not 0
/// - Over-fetch multiplier cap is at least 1.0
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.discovery.timeout_secs == 0 {
        return Err(SettingsError::ValidationError(
            "discovery.timeout_secs cannot be 0".to_string(),
        ));
    }

    if settings.discovery.default_limit == 0 {
        return Err(SettingsError::ValidationError(
            "discovery.default_limit cannot be 0".to_string(),
        ));
    }

    if settings.discovery.max_limit_multiplier < 1.0 {
        return Err(SettingsError::ValidationError(format!(
            "discovery.max_limit_multiplier must be >= 1.0, got {}",
            settings.discovery.max_limit_multiplier
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoverySettings;

    #[test]
    fn test_validate_default_settings() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let settings = Settings {
            discovery: DiscoverySettings {
                timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_settings(&settings);
        assert!(matches!(result, Err(SettingsError::ValidationError(_))));
    }

    #[test]
    fn test_validate_multiplier_below_one_fails() {
        let settings = Settings {
            discovery: DiscoverySettings {
                max_limit_multiplier: 0.5,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("max_limit_multiplier"));
    }
}
