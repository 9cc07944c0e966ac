//! Mapping from [`chainlog_config::Config`] to runtime types.

use anyhow::Context;
use chainlog_config::Config;
use chainlog_ledger::Ledger;
use chainlog_telemetry::{LogConfig, LogFormat};
use tracing::{debug, warn};

/// Build the logging setup described by the config.
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);
    cfg.logging
        .directives
        .iter()
        .fold(LogConfig::new(&cfg.logging.level).with_format(format), |lc, d| {
            lc.with_directive(d)
        })
}

/// Open the ledger on the configured backend.
pub(crate) fn open_ledger(cfg: &Config) -> anyhow::Result<Ledger> {
    if !cfg.storage.is_persistent() {
        warn!("using the in-memory backend; nothing will be kept after exit");
        return Ok(Ledger::in_memory());
    }

    let path = cfg
        .storage
        .path
        .as_deref()
        .context("storage.path is not set")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    debug!(backend = %cfg.storage.backend, path = %path.display(), "opening ledger");
    Ledger::open(path).with_context(|| format!("opening ledger at {}", path.display()))
}

/// Resolve the namespace for a command: explicit flag first, then
/// `mining.default_app`.
pub(crate) fn resolve_app(explicit: Option<String>, cfg: &Config) -> anyhow::Result<String> {
    explicit
        .or_else(|| cfg.mining.default_app.clone())
        .context("no app given; pass --app or set mining.default_app")
}
