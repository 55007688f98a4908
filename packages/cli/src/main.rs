#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the exploration engine.
//!
//! Replays recorded location logs (one JSON [`LocationEvent`] per line) or
//! runs the synthetic test-mode walk, then prints per-neighborhood coverage.
//! Also exports the neighborhood boundaries as `GeoJSON`.
//!
//! The store directory comes from `--data-dir`, then `FOG_MAP_DATA_DIR`,
//! then the config file. Without one the explore ledger is not persisted.
//!
//! [`LocationEvent`]: fog_map_ledger_models::LocationEvent

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fog_map_engine::{EngineConfig, ExplorationEngine, LogObserver};
use fog_map_ledger_models::VisitMode;

/// Measure neighborhood exploration from location logs.
#[derive(Parser)]
#[command(name = "fog_map_cli")]
#[command(about = "Measure neighborhood exploration from location logs")]
struct Cli {
    /// Engine config file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the persisted explore ledger.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Feed a JSON-lines file of location events through the engine.
    Replay {
        /// Path to the events file.
        events: PathBuf,

        /// Ledger to admit into ("explore" or "test").
        #[arg(long, default_value = "explore")]
        mode: VisitMode,

        /// Only report this borough.
        #[arg(long)]
        borough: Option<String>,

        /// Clear the ledger before replaying.
        #[arg(long)]
        fresh: bool,
    },

    /// Walk from a start point toward Prospect Park in test mode.
    Simulate {
        /// Start latitude (defaults to Times Square).
        #[arg(long, allow_hyphen_values = true)]
        start_lat: Option<f64>,

        /// Start longitude (defaults to Times Square).
        #[arg(long, allow_hyphen_values = true)]
        start_lon: Option<f64>,

        /// Only report this borough.
        #[arg(long)]
        borough: Option<String>,
    },

    /// Print coverage for every neighborhood.
    Report {
        /// Ledger to report on ("explore" or "test").
        #[arg(long, default_value = "explore")]
        mode: VisitMode,

        /// Only report this borough.
        #[arg(long)]
        borough: Option<String>,
    },

    /// Clear a ledger (and its persisted copy).
    Clear {
        /// Ledger to clear ("explore" or "test").
        #[arg(long, default_value = "explore")]
        mode: VisitMode,
    },

    /// Write the neighborhood boundaries as a `GeoJSON` feature collection.
    Export {
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = cli
        .data_dir
        .or_else(|| std::env::var_os("FOG_MAP_DATA_DIR").map(PathBuf::from))
    {
        config.data_dir = Some(dir);
    }

    let engine = ExplorationEngine::open(config, Arc::new(LogObserver))?;

    match cli.command {
        Commands::Replay {
            events,
            mode,
            borough,
            fresh,
        } => {
            if fresh {
                engine.clear(mode);
            }
            commands::replay(&engine, &events, mode)?;
            commands::report(&engine, mode, borough.as_deref());
        }
        Commands::Simulate {
            start_lat,
            start_lon,
            borough,
        } => {
            commands::simulate(&engine, start_lat, start_lon);
            commands::report(&engine, VisitMode::Test, borough.as_deref());
        }
        Commands::Report { mode, borough } => {
            commands::report(&engine, mode, borough.as_deref());
        }
        Commands::Clear { mode } => {
            engine.clear(mode);
            println!("Cleared {mode} ledger");
        }
        Commands::Export { output } => commands::export(&engine, output.as_deref())?,
    }

    engine.flush_now().await;

    Ok(())
}
