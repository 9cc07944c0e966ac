//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{BACKEND_MEMORY, BACKEND_SURREALKV, Config};

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_storage(config)?;
    validate_logging(config)?;
    validate_mining(config)?;
    Ok(())
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message,
    }
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    let storage = &config.storage;
    if !matches!(storage.backend.as_str(), BACKEND_MEMORY | BACKEND_SURREALKV) {
        return Err(invalid(
            "storage.backend",
            format!(
                "unsupported backend '{}'; expected one of: {BACKEND_MEMORY}, {BACKEND_SURREALKV}",
                storage.backend
            ),
        ));
    }

    if storage.is_persistent()
        && storage
            .path
            .as_ref()
            .is_none_or(|p| p.as_os_str().is_empty())
    {
        return Err(invalid(
            "storage.path",
            format!("backend '{}' needs a database path", storage.backend),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;
    if !VALID_LEVELS.contains(&logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                logging.level,
                VALID_LEVELS.join(", ")
            ),
        ));
    }
    if !VALID_FORMATS.contains(&logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                logging.format,
                VALID_FORMATS.join(", ")
            ),
        ));
    }
    if logging.directives.iter().any(|d| d.trim().is_empty()) {
        return Err(invalid(
            "logging.directives",
            "directives must not be blank".to_owned(),
        ));
    }
    Ok(())
}

fn validate_mining(config: &Config) -> ConfigResult<()> {
    let Some(app) = config.mining.default_app.as_deref() else {
        return Ok(());
    };
    if app.is_empty() || app.trim() != app || app.chars().any(char::is_control) {
        return Err(invalid(
            "mining.default_app",
            format!("'{app}' is not a usable namespace name"),
        ));
    }
    Ok(())
}
