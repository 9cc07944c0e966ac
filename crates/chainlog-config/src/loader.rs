//! Config file discovery and layered loading.
//!
//! Layers, lowest first:
//! 1. embedded `defaults.toml`
//! 2. `/etc/chainlog/config.toml`
//! 3. `~/.chainlog/config.toml`
//! 4. a file named on the command line
//! 5. `CHAINLOG_*` variables, for fields no file set
//!
//! The merged tree is then deserialized and validated. A persistent backend
//! without a path gets `~/.chainlog/ledger`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, merge_layer};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum accepted config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// System-wide config location.
const SYSTEM_CONFIG_PATH: &str = "/etc/chainlog/config.toml";

/// Directory under the home directory holding user config and data.
pub const HOME_DIR_NAME: &str = ".chainlog";

/// A loaded configuration together with where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Layer that set each non-default field.
    pub field_sources: FieldSources,
    /// Files that contributed, in merge order.
    pub loaded_files: Vec<PathBuf>,
}

impl ResolvedConfig {
    /// Layer that set `field`, or `None` when it holds its default.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<ConfigLayer> {
        self.field_sources.get(field).copied()
    }
}

/// Load with the standard layers.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, or the
/// merged configuration is invalid.
pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let home = home_directory()?;
    load_layers(
        Path::new(SYSTEM_CONFIG_PATH),
        &home,
        explicit,
        &collect_env_vars(),
    )
}

/// Load with the standard layers, using `home` as the home directory.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_home(explicit: Option<&Path>, home: &Path) -> ConfigResult<ResolvedConfig> {
    load_layers(
        Path::new(SYSTEM_CONFIG_PATH),
        home,
        explicit,
        &collect_env_vars(),
    )
}

pub(crate) fn load_layers<S: ::std::hash::BuildHasher>(
    system_path: &Path,
    home: &Path,
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();

    let user_path = home.join(HOME_DIR_NAME).join("config.toml");
    for (path, layer) in [
        (system_path, ConfigLayer::System),
        (user_path.as_path(), ConfigLayer::User),
    ] {
        if let Some(overlay) = try_load_file(path)? {
            merge_layer(&mut merged, &overlay, layer, &mut field_sources);
            info!(path = %path.display(), layer = %layer, "loaded config");
            loaded_files.push(path.to_path_buf());
        }
    }

    if let Some(path) = explicit {
        let overlay = read_file(path)?;
        merge_layer(
            &mut merged,
            &overlay,
            ConfigLayer::Explicit,
            &mut field_sources,
        );
        info!(path = %path.display(), "loaded explicit config");
        loaded_files.push(path.to_path_buf());
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let mut config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;
    if config.storage.is_persistent() && config.storage.path.is_none() {
        config.storage.path = Some(home.join(HOME_DIR_NAME).join("ledger"));
    }

    validate::validate(&config)?;
    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a single file over the built-in defaults, without other layers.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, malformed,
/// or invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_to_string(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match read_file(path) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

fn read_to_string(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Checked after the read so there is no gap between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }
    Ok(content)
}

/// The user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
