#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for chainlog binaries.
//!
//! # Usage
//!
//! ```rust,no_run
//! use chainlog_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("backend: {}", resolved.config.storage.backend);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest:
//!
//! 1. a file passed with `--config`
//! 2. `~/.chainlog/config.toml`
//! 3. `/etc/chainlog/config.toml`
//! 4. `CHAINLOG_*` environment variables, only for fields no file set
//! 5. the embedded `defaults.toml`
//!
//! This crate does not depend on the other chainlog crates. Binaries map
//! [`Config`] onto ledger and logging types themselves.

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// File discovery and layered loading.
pub mod loader;
/// Merging TOML layers with source tracking.
pub mod merge;
pub mod prelude;
/// Configuration struct definitions.
pub mod types;
/// Validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load with the full layer chain. `explicit` is an extra file merged
    /// above the user config.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file is malformed or the result fails
    /// validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }

    /// Like [`Config::load`], with an explicit home directory.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with_home(
        explicit: Option<&std::path::Path>,
        home: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load_with_home(explicit, home)
    }

    /// Load one file with no layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
