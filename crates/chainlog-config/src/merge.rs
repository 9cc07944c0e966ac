//! Layer merging over raw TOML trees.
//!
//! Merging happens before deserialization so that a key missing from a
//! file leaves the lower layer's value alone.

use std::collections::HashMap;
use std::fmt;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// `/etc/chainlog/config.toml`.
    System,
    /// `~/.chainlog/config.toml`.
    User,
    /// A file named on the command line.
    Explicit,
    /// An environment variable fallback.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system (/etc/chainlog/config.toml)"),
            Self::User => write!(f, "user (~/.chainlog/config.toml)"),
            Self::Explicit => write!(f, "explicit config file"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Dotted field path to the layer that last set it. Fields still at their
/// built-in default have no entry.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Merge `overlay` into `base`, recording every leaf the overlay sets.
///
/// Tables merge per key. Scalars and arrays replace.
pub fn merge_layer(
    base: &mut toml::Value,
    overlay: &toml::Value,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    merge_at(base, overlay, "", layer, sources);
}

fn merge_at(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                let path = join(prefix, key);
                match base_table.get_mut(key) {
                    Some(existing) if value.is_table() => {
                        merge_at(existing, value, &path, layer, sources);
                    },
                    Some(existing) => {
                        *existing = value.clone();
                        sources.insert(path, layer);
                    },
                    None => {
                        base_table.insert(key.clone(), value.clone());
                        record_leaves(value, &path, layer, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

fn record_leaves(value: &toml::Value, prefix: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = value {
        for (key, child) in table {
            record_leaves(child, &join(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_replaces_only_named_keys() {
        let mut base = parse("[logging]\nlevel = \"warn\"\nformat = \"compact\"\n");
        let mut sources = FieldSources::new();
        merge_layer(
            &mut base,
            &parse("[logging]\nlevel = \"debug\"\n"),
            ConfigLayer::User,
            &mut sources,
        );

        assert_eq!(base["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(base["logging"]["format"].as_str(), Some("compact"));
        assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::User));
        assert!(!sources.contains_key("logging.format"));
    }

    #[test]
    fn test_new_tables_record_every_leaf() {
        let mut base = parse("[logging]\nlevel = \"warn\"\n");
        let mut sources = FieldSources::new();
        merge_layer(
            &mut base,
            &parse("[mining]\ndefault_app = \"shop\"\n"),
            ConfigLayer::System,
            &mut sources,
        );

        assert_eq!(base["mining"]["default_app"].as_str(), Some("shop"));
        assert_eq!(
            sources.get("mining.default_app"),
            Some(&ConfigLayer::System)
        );
    }

    #[test]
    fn test_later_layer_wins() {
        let mut base = parse("[storage]\nbackend = \"surrealkv\"\n");
        let mut sources = FieldSources::new();
        merge_layer(
            &mut base,
            &parse("[storage]\nbackend = \"memory\"\n"),
            ConfigLayer::User,
            &mut sources,
        );
        merge_layer(
            &mut base,
            &parse("[storage]\nbackend = \"surrealkv\"\n"),
            ConfigLayer::Explicit,
            &mut sources,
        );

        assert_eq!(base["storage"]["backend"].as_str(), Some("surrealkv"));
        assert_eq!(sources.get("storage.backend"), Some(&ConfigLayer::Explicit));
    }
}
