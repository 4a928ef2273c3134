//! # Trajectory Graph Pipeline
//!
//! This crate turns multi-agent trajectory recordings into per-time-step
//! graph sequences for spatio-temporal graph networks, and scores such
//! networks. It includes configuration management, scene file parsing and
//! window assembly, graph construction, class-reweighted losses, sampling
//! based ADE/FDE evaluation and NumPy export.
//!
//! ## Architecture
//!
//! ```text
//! TrajectoryConfig ──► TrajectoryDataset ──► GraphBuilder ──► WindowGraphs
//!       │                     │                                   │
//!       │               read_trajectory_file                      ▼
//!       │               geometry::non_linearity_flag       TrajectoryModel
//!       │                                                         │
//!       ├──► ClassRegistry / ClassWeightTable ──► GraphLoss ◄──────┤
//!       │                                                         │
//!       └──► Evaluator ──► metrics (sampling, ADE / FDE) ◄────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use trajgraph_train::config::TrajectoryConfig;
//! use trajgraph_train::dataset::{GraphDataset, TrajectoryDataset};
//!
//! let config = TrajectoryConfig::default();
//! config.validate().expect("config is valid");
//!
//! let dataset = TrajectoryDataset::from_dir(Path::new("datasets/sdd/train"), &config).unwrap();
//! let sample = dataset.get(0).unwrap();
//! println!("V_obs shape: {:?}", sample.graphs.obs.nodes.shape());
//! println!("A_obs shape: {:?}", sample.graphs.obs.adjacency.shape());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod classes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod export;
pub mod geometry;
pub mod graph;
pub mod losses;
pub mod metrics;
pub mod model;

// Convenient re-exports at the crate root.
pub use classes::{ClassRegistry, ClassWeightTable};
pub use config::TrajectoryConfig;
pub use dataset::{DataLoader, GraphDataset, TrajectoryDataset, TrajectorySample};
pub use error::{ConfigError, DatasetError, TrainError, TrainResult};
pub use eval::{EvalReport, Evaluator};
pub use graph::{GraphBuilder, GraphSequence};
pub use losses::GraphLoss;
pub use metrics::EvalMetrics;
pub use model::{ConstantVelocityModel, TrajectoryModel};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
