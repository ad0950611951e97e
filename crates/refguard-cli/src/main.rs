//! Refguard Command-Line Interface
//!
//! Manage an embedded refguard store: apply schemas, write documents
//! through the guarded pipeline and inspect references.

mod commands;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use formatter::OutputFormat;
use refguard_core::config::DEFAULT_BATCH_SIZE;
use refguard_core::GuardConfig;
use refguard_store::StoreConfig;

/// Default data directory.
pub const DEFAULT_DATA_PATH: &str = "./refguard_data";

/// Refguard Command-Line Interface
#[derive(Parser, Debug)]
#[command(name = "refguard")]
#[command(version, about = "Referential integrity for schema-less document stores")]
pub struct Args {
    /// Path to the database directory
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Do not validate references on save
    #[arg(long)]
    pub disable_save: bool,

    /// Do not validate references on update
    #[arg(long)]
    pub disable_update: bool,

    /// Do not block deletes of referenced documents
    #[arg(long)]
    pub disable_delete: bool,

    /// Trace every reference check
    #[arg(long)]
    pub log_checks: bool,

    /// Maximum identifiers per existence count
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register the collection schemas listed in a JSON file, in order
    ApplySchema {
        /// JSON array of collection schemas
        file: PathBuf,
    },
    /// List registered collections
    Collections,
    /// Save documents from a JSON file (an object or an array of objects)
    Insert {
        collection: String,
        file: PathBuf,
    },
    /// Apply an update payload to one document
    Update {
        collection: String,
        id: String,
        payload_file: PathBuf,
    },
    /// Delete one document by identity
    Delete { collection: String, id: String },
    /// Report the reference validity of a JSON document without saving it
    Check {
        collection: String,
        file: PathBuf,
    },
    /// List the collections that still reference a document
    Refs { collection: String, id: String },
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ApplySchema { .. } => "apply-schema",
            Command::Collections => "collections",
            Command::Insert { .. } => "insert",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::Check { .. } => "check",
            Command::Refs { .. } => "refs",
        }
    }
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub guard: GuardConfig,
    pub format: OutputFormat,
}

impl Args {
    /// Convert arguments into store and guard configuration.
    pub fn into_config(self) -> (CliConfig, Command) {
        let guard = GuardConfig::default()
            .with_save(!self.disable_save)
            .with_update(!self.disable_update)
            .with_delete(!self.disable_delete)
            .with_logging(self.log_checks)
            .with_batch_size(self.batch_size);

        let config = CliConfig {
            store: StoreConfig::new(self.data_path),
            guard,
            format: self.format,
        };
        (config, self.command)
    }

    fn default_log_filter(&self) -> &'static str {
        if self.log_checks {
            "refguard=debug"
        } else {
            "refguard=info"
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let default_filter = args.default_log_filter();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting refguard");

    let (config, command) = args.into_config();
    tracing::info!(
        data_path = %config.store.path.display(),
        command = command.name(),
        guard = ?config.guard,
        "configuration loaded"
    );
    if let Err(e) = commands::run(config, command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
