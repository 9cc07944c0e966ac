//! Chainlog Telemetry - Logging setup for chainlog binaries and tests.
//!
//! This crate provides:
//! - A serializable [`LogConfig`] with pretty, compact, JSON and full formats
//! - Output to stdout, stderr or rotating files
//! - One-call installation of the global `tracing` subscriber
//!
//! Library crates only emit `tracing` events; binaries decide where they go.
//!
//! # Example
//!
//! ```rust,no_run
//! use chainlog_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), chainlog_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("chainlog_ledger=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!(app = "shop", "Ledger ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
