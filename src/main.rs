//! Binary entry point for flatstore.
//!
//! This binary provides a small CLI over directory and log stores of JSON
//! objects.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flatstore::cli::{self, Layout, ValueStore};
use flatstore::config::StoreConfig;
use flatstore::observability::{self, LoggingConfig};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Flatstore - flat-file JSON record stores.
#[derive(Parser)]
#[command(name = "flatstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "FLATSTORE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Base directory for stores (overrides config and environment).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Store selection shared by every command.
#[derive(Args)]
struct StoreArgs {
    /// Store name.
    name: String,

    /// Use the single-file log layout.
    #[arg(long, conflicts_with = "key")]
    log: bool,

    /// Field the directory layout is keyed by.
    #[arg(short, long, default_value = "id")]
    key: String,
}

impl StoreArgs {
    fn open(self, config: &StoreConfig) -> anyhow::Result<ValueStore> {
        let name = self.name;
        ValueStore::open(config, &name, Layout::from_flags(self.log, self.key))
            .with_context(|| format!("failed to open store '{name}'"))
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Print every record, one JSON document per line.
    List {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print the number of records.
    Count {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Add a record given as JSON.
    Add {
        #[command(flatten)]
        store: StoreArgs,

        /// The record, e.g. '{"id": 1, "title": "Hello"}'.
        json: String,
    },

    /// Remove a record by key, or by full JSON for a log store.
    Remove {
        #[command(flatten)]
        store: StoreArgs,

        /// Key (directory layout) or record JSON (log layout).
        selector: String,
    },

    /// Remove every record.
    Clear {
        #[command(flatten)]
        store: StoreArgs,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };
    let config = match cli.data_dir.clone() {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &StoreConfig) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();

    match command {
        Commands::List { store } => {
            let store = store.open(config)?;
            cli::list(&store, &mut stdout)?;
        },

        Commands::Count { store } => {
            let store = store.open(config)?;
            writeln!(stdout, "{}", cli::count(&store))?;
        },

        Commands::Add { store, json } => {
            let mut store = store.open(config)?;
            cli::add(&mut store, &json).context("failed to add record")?;
        },

        Commands::Remove { store, selector } => {
            let mut store = store.open(config)?;
            if !cli::remove(&mut store, &selector).context("failed to remove record")? {
                eprintln!("No matching record for '{selector}'");
            }
        },

        Commands::Clear { store } => {
            let mut store = store.open(config)?;
            cli::clear(&mut store).context("failed to clear store")?;
        },
    }

    Ok(())
}

/// Loads configuration, then applies environment overrides.
fn load_config(path: Option<&Path>) -> anyhow::Result<StoreConfig> {
    let config = match path {
        Some(path) => StoreConfig::load_from_file(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => StoreConfig::load_default(),
    };

    Ok(config.with_env_overrides())
}
