//! `build-dataset` binary: assemble trajectory windows and optionally export
//! them as NumPy arrays.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin build-dataset -- datasets/sdd/train
//! cargo run --bin build-dataset -- datasets/sdd/train --config run.json --export out/train
//! ```

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use trajgraph_train::config::TrajectoryConfig;
use trajgraph_train::dataset::{GraphDataset, TrajectoryDataset};
use trajgraph_train::export::export_dataset;

/// Command-line arguments for the dataset builder.
#[derive(Parser, Debug)]
#[command(
    name = "build-dataset",
    version,
    about = "Assemble trajectory graph windows from a directory of scene files",
    long_about = None
)]
struct Args {
    /// Directory holding the scene files.
    #[arg(value_name = "DIR")]
    data_dir: PathBuf,

    /// Path to a JSON configuration file.
    ///
    /// If not provided, the default `TrajectoryConfig` is used.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write every window as `.npy` files into this directory.
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Print the assembly counters as JSON to stdout.
    #[arg(long, default_value_t = false)]
    stats_json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("Trajectory graph dataset builder v{}", trajgraph_train::VERSION);

    let config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            match TrajectoryConfig::from_json(path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    error!("Failed to load configuration: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => TrajectoryConfig::default(),
    };

    info!("  obs / pred    : {} / {}", config.obs_len, config.pred_len);
    info!("  skip          : {}", config.skip);
    info!("  min agents    : > {}", config.min_ped);
    info!("  labels        : {}", config.labels.join(", "));

    let dataset = match TrajectoryDataset::from_dir(&args.data_dir, &config) {
        Ok(ds) => ds,
        Err(e) => {
            error!("Failed to build dataset: {e}");
            std::process::exit(1);
        }
    };

    let stats = dataset.stats();
    info!(
        "{} windows, {} agents, at most {} agents per window",
        dataset.len(),
        stats.agents_kept,
        stats.max_agents_in_window
    );

    if args.stats_json {
        match serde_json::to_string_pretty(stats) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Failed to serialise stats: {e}");
                std::process::exit(1);
            }
        }
    }

    if let Some(out) = args.export.as_deref() {
        if let Err(e) = export_dataset(&dataset, out) {
            error!("Export failed: {e}");
            std::process::exit(1);
        }
    }
}
