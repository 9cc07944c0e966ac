//! Configuration schema.
//!
//! Every section derives `Default` and uses `#[serde(default)]`, so a file
//! only needs the keys it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage backend name for the in-process store.
pub const BACKEND_MEMORY: &str = "memory";
/// Storage backend name for the embedded on-disk store.
pub const BACKEND_SURREALKV: &str = "surrealkv";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the ledger lives.
    pub storage: StorageSection,
    /// Log output.
    pub logging: LoggingSection,
    /// Mining defaults.
    pub mining: MiningSection,
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `"memory"` or `"surrealkv"`.
    pub backend: String,
    /// Database directory for persistent backends.
    pub path: Option<PathBuf>,
}

impl StorageSection {
    /// Whether the backend keeps data across runs.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend != BACKEND_MEMORY
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: BACKEND_SURREALKV.to_owned(),
            path: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level: `"trace"`, `"debug"`, `"info"`, `"warn"` or `"error"`.
    pub level: String,
    /// `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Extra filter directives such as `"chainlog_ledger=debug"`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

/// Mining defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSection {
    /// Namespace used when a command does not name one.
    pub default_app: Option<String>,
}
