//! Environment variable fallbacks.
//!
//! A variable only applies when no config file set its field. Built-in
//! defaults do not count as set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// A `CHAINLOG_*` variable and the field it feeds.
#[derive(Debug, Clone, Copy)]
pub struct EnvMapping {
    /// Variable name.
    pub var_name: &'static str,
    /// Dotted field path.
    pub field_path: &'static str,
}

/// Every recognised variable.
pub const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "CHAINLOG_STORAGE_BACKEND",
        field_path: "storage.backend",
    },
    EnvMapping {
        var_name: "CHAINLOG_STORAGE_PATH",
        field_path: "storage.path",
    },
    EnvMapping {
        var_name: "CHAINLOG_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "CHAINLOG_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "CHAINLOG_DEFAULT_APP",
        field_path: "mining.default_app",
    },
];

/// Apply fallbacks for fields no file layer set.
///
/// Returns the number of variables applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] for a blank value.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources.contains_key(mapping.field_path) {
            continue;
        }
        let Some(value) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if value.trim().is_empty() {
            return Err(ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: "value is blank".to_owned(),
            });
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(
            merged,
            mapping.field_path,
            toml::Value::String(value.clone()),
        );
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Collect the process environment, skipping variables that are not UTF-8.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Set a dotted field, creating intermediate tables as needed.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}
