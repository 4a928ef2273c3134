//! `evaluate-baseline` binary: score the constant-velocity baseline on a
//! directory of scene files.
//!
//! Reports best-of-K and mean-of-K ADE/FDE and the class-reweighted
//! validation loss. The numbers serve as a floor for trained networks.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin evaluate-baseline -- datasets/sdd/test
//! cargo run --bin evaluate-baseline -- datasets/sdd/test --class-info classInfo.json --output baseline.json
//! ```

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use trajgraph_train::classes::{ClassRegistry, ClassWeightTable};
use trajgraph_train::config::{LossKind, TrajectoryConfig};
use trajgraph_train::dataset::TrajectoryDataset;
use trajgraph_train::eval::Evaluator;
use trajgraph_train::losses::GraphLoss;
use trajgraph_train::metrics::EvalMetrics;
use trajgraph_train::model::{ConstantVelocityModel, TrajectoryModel};

/// Command-line arguments for the baseline evaluator.
#[derive(Parser, Debug)]
#[command(
    name = "evaluate-baseline",
    version,
    about = "Evaluate a constant-velocity baseline with sampling-based ADE/FDE",
    long_about = None
)]
struct Args {
    /// Directory holding the scene files.
    #[arg(value_name = "DIR")]
    data_dir: PathBuf,

    /// Path to a JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Isotropic standard deviation of the baseline, in scaled units.
    #[arg(long, default_value_t = 0.1)]
    sigma: f32,

    /// Class weight file (`classInfo.json`); uniform weights if omitted.
    #[arg(long, value_name = "FILE")]
    class_info: Option<PathBuf>,

    /// Override the number of samples per agent.
    #[arg(long)]
    samples: Option<usize>,

    /// Write the report as JSON to this file.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Serialize)]
struct BaselineReport {
    model: String,
    sigma: f32,
    metrics: EvalMetrics,
    validation_loss: f64,
}

fn run(args: &Args) -> Result<BaselineReport, Box<dyn std::error::Error>> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TrajectoryConfig::from_json(path)?
        }
        None => TrajectoryConfig::default(),
    };
    if let Some(k) = args.samples {
        config.num_samples = k;
    }
    config.validate()?;
    if !(args.sigma.is_finite() && args.sigma > 0.0) {
        return Err(format!("--sigma must be finite and > 0, got {}", args.sigma).into());
    }

    let dataset = TrajectoryDataset::from_dir(&args.data_dir, &config)?;

    let table = match args.class_info.as_deref() {
        Some(path) => ClassWeightTable::from_json(path)?,
        None => ClassWeightTable::uniform(&ClassRegistry::from_config(&config)),
    };
    let loss = GraphLoss::from_config(
        &TrajectoryConfig { loss_kind: LossKind::Bivariate, ..config.clone() },
        &table,
    )?;

    let model = ConstantVelocityModel::bivariate(config.pred_len, args.sigma);
    let evaluator = Evaluator::new(&config);
    let report = evaluator.evaluate(&model, &dataset)?;
    let validation_loss = evaluator.validation_loss(&model, &dataset, &loss)?;

    Ok(BaselineReport {
        model: model.name().to_string(),
        sigma: args.sigma,
        metrics: report.metrics,
        validation_loss,
    })
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

    info!("Trajectory baseline evaluator v{}", trajgraph_train::VERSION);

    let report = match run(&args) {
        Ok(r) => r,
        Err(e) => {
            error!("Evaluation failed: {e}");
            std::process::exit(1);
        }
    };

    info!("{}", report.metrics.summary());
    info!("validation loss: {:.6}", report.validation_loss);

    if let Some(path) = args.output.as_deref() {
        let written = serde_json::to_string_pretty(&report)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            error!("Failed to write report to {}: {e}", path.display());
            std::process::exit(1);
        }
        info!("Report written to {}", path.display());
    }
}
