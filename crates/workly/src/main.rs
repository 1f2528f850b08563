// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workly - long-term memory maintenance for the avatar companion.
//!
//! This is the binary entry point. The desktop app embeds the memory crates
//! directly; this tool migrates, inspects and maintains the store.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod context;
mod doctor;
mod migrate;
mod stack;
mod stats;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use workly_config::WorklyConfig;
use workly_core::WorklyError;

/// Workly - long-term memory for the avatar companion.
#[derive(Parser, Debug)]
#[command(name = "workly", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Import the legacy JSON memory files into SQLite.
    MigrateJson {
        /// Directory holding the legacy files (defaults to storage.legacy_json_dir).
        #[arg(long)]
        json_dir: Option<PathBuf>,
        /// Where to copy the files before reading them.
        #[arg(long)]
        backup_dir: Option<PathBuf>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print memory, emotion and personality statistics.
    Stats {
        /// Print the statistics as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Compact the database and fold the WAL back into it.
    Vacuum,
    /// Print the prompt context assembled for a query.
    Context {
        query: String,
        /// Token budget for the context blob.
        #[arg(long)]
        max_tokens: Option<usize>,
        /// Leave out the facts digest.
        #[arg(long)]
        no_facts: bool,
    },
    /// Check configuration and storage health.
    Doctor {
        /// Also run the integrity check.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            workly_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.app.log_level);

    let result = match cli.command {
        Some(Commands::MigrateJson {
            json_dir,
            backup_dir,
            json,
        }) => migrate::run_migrate_json(&config, json_dir, backup_dir, json).await,
        Some(Commands::Stats { json }) => stats::run_stats(&config, json).await,
        Some(Commands::Vacuum) => stats::run_vacuum(&config).await,
        Some(Commands::Context {
            query,
            max_tokens,
            no_facts,
        }) => context::run_context(&config, &query, max_tokens, !no_facts).await,
        Some(Commands::Doctor { deep, plain }) => {
            doctor::run_doctor(&config, cli.config.as_deref(), deep, plain).await
        }
        None => {
            println!("workly: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<WorklyConfig, Vec<workly_config::ConfigError>> {
    match path {
        Some(path) => workly_config::load_and_validate_path(path),
        None => workly_config::load_and_validate(),
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the config level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("workly={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Map a failure to print a report into the crate error type.
pub(crate) fn render_err(e: serde_json::Error) -> WorklyError {
    WorklyError::Internal(format!("failed to render report: {e}"))
}
