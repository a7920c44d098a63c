//! Idle progression - Development Tools

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use idle_core::prelude::{FileStore, Persistence};
use idle_tools::simulate::{run_simulation, SimulationOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "idle-tools")]
#[command(about = "Development tools for the idle progression engine")]
struct Cli {
    /// Log debug output unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Run a headless session
    Simulate {
        /// Path to data directory
        #[arg(long, default_value = "assets/data")]
        data: PathBuf,
        /// Save file to resume from and write back (.ron or binary)
        #[arg(long)]
        save: Option<PathBuf>,
        /// Simulated seconds
        #[arg(long, default_value_t = 3600.0)]
        seconds: f64,
        /// Step size in seconds
        #[arg(long, default_value_t = 1.0)]
        step: f64,
        /// Start time as unix seconds (defaults to now)
        #[arg(long)]
        now: Option<u64>,
        /// Buy the cheapest unlock or upgrade whenever affordable
        #[arg(long)]
        auto_upgrade: bool,
        /// Prestige whenever allowed
        #[arg(long)]
        prestige: bool,
    },
    /// Print a save file as JSON
    Inspect {
        /// Save file (.ron or binary)
        path: PathBuf,
    },
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match idle_tools::validate::ensure_valid(&path) {
                Ok(report) => tracing::info!(
                    "Validation passed: {} buildings, {} modules, {} prestige bonuses",
                    report.buildings,
                    report.modules,
                    report.prestige_bonuses
                ),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Simulate {
            data,
            save,
            seconds,
            step,
            now,
            auto_upgrade,
            prestige,
        } => {
            let options = SimulationOptions {
                data_dir: data,
                save_path: save,
                seconds,
                step,
                start_time: now.unwrap_or_else(unix_now),
                auto_upgrade,
                auto_prestige: prestige,
            };
            match run_simulation(&options) {
                Ok(summary) => match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        tracing::error!("Failed to encode summary: {e}");
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    tracing::error!("Simulation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Inspect { path } => {
            let mut store = FileStore::new(path.clone());
            match store.load() {
                Ok(Some(snapshot)) => match serde_json::to_string_pretty(&snapshot) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        tracing::error!("Failed to encode snapshot: {e}");
                        std::process::exit(1);
                    }
                },
                Ok(None) => {
                    tracing::error!("No save file at {}", path.display());
                    std::process::exit(1);
                }
                Err(e) => {
                    tracing::error!("Failed to read save: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
