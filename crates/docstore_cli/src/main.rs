//! docstore CLI
//!
//! Command-line tools over a docstore change-log file.
//!
//! Every command opens the log, rebuilds the collection by replaying it,
//! and then acts on that state. Writes are journaled back into the log.
//!
//! # Commands
//!
//! - `inspect` - Log file statistics
//! - `monitor` - Newest log entries
//! - `recover` - Replay a recovery batch into an empty store
//! - `drill` - Wipe the rebuilt store and replay the log
//! - `create`, `get`, `update`, `approve`, `delete`, `list`, `find` - Records

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docstore change-log tools.
#[derive(Parser)]
#[command(name = "docstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the change-log file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// JSON configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display change-log statistics
    Inspect,

    /// Show the newest change-log entries, newest first
    Monitor {
        /// Maximum number of entries (defaults to the configured limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Replay a recovery batch into an empty store and report the outcome
    Recover {
        /// Replay every entry after this timestamp (`seconds:increment`)
        #[arg(short, long)]
        since: Option<String>,
    },

    /// Run a disaster-recovery drill
    Drill,

    /// Create a record from `field=json` assignments
    Create {
        /// Field assignments, e.g. `titulo="Acta"` or `paginas=3`
        fields: Vec<String>,
    },

    /// Show one record
    Get {
        /// Record id
        id: String,
    },

    /// Update a record, failing if it is no longer at `expected_version`
    Update {
        /// Record id
        id: String,

        /// Version the update is based on
        #[arg(short, long)]
        expected_version: u64,

        /// Field assignments (`path=json`)
        #[arg(short, long)]
        set: Vec<String>,

        /// Field paths to remove
        #[arg(short, long)]
        unset: Vec<String>,
    },

    /// Approve a record
    Approve {
        /// Record id
        id: String,

        /// Who approves
        #[arg(short, long, default_value = "admin")]
        actor: String,
    },

    /// Delete a record
    Delete {
        /// Record id
        id: String,
    },

    /// List records
    List {
        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Find records whose field equals a JSON value
    Find {
        /// Field path, e.g. `metadatos.autor`
        field: String,

        /// Value to match, as JSON
        value: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("docstore CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = commands::config::load(cli.config.as_deref())?;
    let path = cli.path.ok_or("Change-log path required")?;
    let format = cli.format.as_str();

    match cli.command {
        Commands::Inspect => commands::log::inspect(&path, config, format)?,
        Commands::Monitor { limit } => commands::log::monitor(&path, config, limit, format)?,
        Commands::Recover { since } => {
            commands::recovery::recover(&path, config, since.as_deref(), format)?;
        }
        Commands::Drill => commands::recovery::drill(&path, config, format)?,
        Commands::Create { fields } => commands::records::create(&path, config, &fields, format)?,
        Commands::Get { id } => commands::records::get(&path, config, &id, format)?,
        Commands::Update {
            id,
            expected_version,
            set,
            unset,
        } => commands::records::update(
            &path,
            config,
            &id,
            expected_version,
            &set,
            &unset,
            format,
        )?,
        Commands::Approve { id, actor } => {
            commands::records::approve(&path, config, &id, &actor, format)?;
        }
        Commands::Delete { id } => commands::records::delete(&path, config, &id)?,
        Commands::List { limit } => commands::records::list(&path, config, limit, format)?,
        Commands::Find { field, value } => {
            commands::records::find(&path, config, &field, &value, format)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
