//! CLI theme and styling.

use chainlog_core::Timestamp;
use chainlog_ledger::Action;
use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    pub(crate) fn separator() -> String {
        "━".repeat(60).dimmed().to_string()
    }

    /// Format a key-value line.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("  {:<12} {}", format!("{key}:").bold(), value)
    }

    /// Shortened base-62 id.
    pub(crate) fn short_id(base62: &str) -> String {
        let short: String = base62.chars().take(8).collect();
        format!("{}", short.cyan())
    }

    /// Format a timestamp.
    pub(crate) fn timestamp(ts: &Timestamp) -> String {
        ts.0.format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
            .to_string()
    }

    /// Color an action by what it does to the record.
    pub(crate) fn action(action: Action) -> String {
        let label = format!("{:<6}", action.as_str());
        match action {
            Action::Insert => label.green().to_string(),
            Action::Update | Action::Upsert => label.yellow().to_string(),
            Action::Delete => label.red().to_string(),
        }
    }
}
