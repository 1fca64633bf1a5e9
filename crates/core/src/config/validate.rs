use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Validate configuration.
///
/// Missing directory credentials pass validation; each provisioning run
/// reports `CredentialsMissing` instead.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.directory.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "directory.timeout_secs cannot be 0".to_string(),
        ));
    }

    let provisioning = &config.provisioning;
    if provisioning.max_suffix < 2 {
        return Err(ConfigError::ValidationError(
            "provisioning.max_suffix must be at least 2".to_string(),
        ));
    }
    if provisioning.usage_location.len() != 2 {
        return Err(ConfigError::ValidationError(format!(
            "provisioning.usage_location must be a two-letter country code, got {:?}",
            provisioning.usage_location
        )));
    }
    if provisioning.initial_password.is_empty() {
        return Err(ConfigError::ValidationError(
            "provisioning.initial_password cannot be empty".to_string(),
        ));
    }

    Ok(())
}
