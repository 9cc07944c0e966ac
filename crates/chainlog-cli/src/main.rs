//! Chainlog CLI - inspect and drive a hash-chained audit ledger.
//!
//! Every command opens the ledger named by the configuration, does one thing
//! and exits. Logs go to stderr, results to stdout.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use chainlog_config::Config;
use chainlog_core::{BlockId, NodeId};
use chainlog_ledger::Action;
use clap::{Parser, Subcommand};

mod commands;
mod config_bridge;
mod theme;

use commands::{id, inspect, mine, record, verify};

/// Chainlog - hash-chained audit ledger
#[derive(Parser)]
#[command(name = "chainlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra config file, merged above the user config
    #[arg(short, long, global = true, env = "CHAINLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture one operation by hand
    Record {
        /// Namespace (defaults to mining.default_app)
        #[arg(long)]
        app: Option<String>,

        /// Model name, qualified with the app unless it already has a prefix
        #[arg(long)]
        model: String,

        /// INSERT, UPDATE, DELETE or UPSERT
        #[arg(long)]
        action: Action,

        /// Target record id, as a UUID or base-62
        #[arg(long)]
        target: String,

        /// Field values as a JSON object
        #[arg(long)]
        values: Option<String>,
    },

    /// List operations waiting to be minted
    Pending {
        /// Namespace (defaults to mining.default_app)
        #[arg(long)]
        app: Option<String>,
    },

    /// Mint pending operations into the next block
    Mine {
        /// Namespace (defaults to mining.default_app)
        #[arg(long)]
        app: Option<String>,
    },

    /// List chains
    Chains,

    /// List the blocks of a chain
    Blocks {
        /// Namespace (defaults to mining.default_app)
        #[arg(long)]
        app: Option<String>,
    },

    /// Show one block and its operations
    ShowBlock {
        /// Block id, as a UUID or base-62
        id: String,

        /// Print the stored JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Verify chain integrity
    Verify {
        /// Only this namespace; all chains when omitted
        #[arg(long)]
        app: Option<String>,
    },

    /// Convert identifiers
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },
}

#[derive(Subcommand)]
enum IdCommands {
    /// UUID to base-62
    Encode {
        /// UUID
        uuid: String,
    },
    /// Base-62 to UUID
    Decode {
        /// Base-62 id
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_deref());

    let logging = match &loaded {
        Ok(resolved) => {
            let mut lc = config_bridge::to_log_config(&resolved.config);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            chainlog_telemetry::setup_logging(&lc)
        },
        // Config errors are reported through the fallback subscriber.
        Err(_) if cli.verbose => {
            chainlog_telemetry::setup_logging(&chainlog_telemetry::LogConfig::new("debug"))
        },
        Err(_) => chainlog_telemetry::setup_default_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Commands::Id { command } = &cli.command {
        let output = match command {
            IdCommands::Encode { uuid } => id::encode(uuid)?,
            IdCommands::Decode { id } => id::decode(id)?,
        };
        println!("{output}");
        return Ok(());
    }

    let resolved = loaded?;
    for path in &resolved.loaded_files {
        tracing::debug!(path = %path.display(), "using config file");
    }
    let config = resolved.config;
    let ledger = config_bridge::open_ledger(&config)?;

    match cli.command {
        Commands::Record {
            app,
            model,
            action,
            target,
            values,
        } => {
            let app = config_bridge::resolve_app(app, &config)?;
            let target = NodeId::from_uuid(commands::parse_uuid(&target)?);
            record::record_operation(
                &ledger,
                &app,
                &qualify_model(&app, &model),
                action,
                target,
                values.as_deref(),
            )
        },
        Commands::Pending { app } => {
            record::list_pending(&ledger, &config_bridge::resolve_app(app, &config)?)
        },
        Commands::Mine { app } => {
            mine::mine_block(&ledger, &config_bridge::resolve_app(app, &config)?)
        },
        Commands::Chains => inspect::list_chains(&ledger),
        Commands::Blocks { app } => {
            inspect::list_blocks(&ledger, &config_bridge::resolve_app(app, &config)?)
        },
        Commands::ShowBlock { id, json } => {
            let id = BlockId::from_uuid(commands::parse_uuid(&id)?);
            inspect::show_block(&ledger, id, json)
        },
        Commands::Verify { app } => {
            verify::verify_chains(&ledger, app.as_deref())
        },
        Commands::Id { .. } => Ok(()),
    }
}

/// `"<app>:<model>"` unless `model` already carries a prefix.
fn qualify_model(app: &str, model: &str) -> String {
    if model.contains(':') {
        model.to_owned()
    } else {
        format!("{app}:{model}")
    }
}
