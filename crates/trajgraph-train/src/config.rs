//! Run configuration for trajectory graph datasets, losses and evaluation.
//!
//! [`TrajectoryConfig`] is the single immutable source of truth for window
//! lengths, filtering thresholds, class labels, graph options and sampling
//! settings. It is built once per run and passed by reference into the
//! dataset, the loss engine and the evaluator. It is serializable via
//! [`serde`] so it can be stored next to a trained checkpoint and restored
//! when that checkpoint is evaluated.
//!
//! # Example
//!
//! ```rust
//! use trajgraph_train::config::TrajectoryConfig;
//!
//! let cfg = TrajectoryConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! assert_eq!(cfg.seq_len(), 20);
//! assert_eq!(cfg.labels.len(), 6);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Option enums
// ---------------------------------------------------------------------------

/// Field delimiter of the raw scene files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// A single space character. Runs of spaces produce empty fields, so
    /// such lines fail the field-count check and are skipped.
    Space,
    /// A single tab character.
    Tab,
    /// Any run of ASCII whitespace.
    Whitespace,
}

impl Delimiter {
    /// Split a (trimmed) line into fields.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Space => line.split(' ').collect(),
            Delimiter::Tab => line.split('\t').collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        }
    }
}

/// Edge weighting policy used by the graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeWeighting {
    /// `1 / distance`, zero for coincident agents.
    InverseDistance,
    /// `exp(-distance)`.
    Exponential,
}

/// Loss variant, selected by the kind of model being trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Negative log-likelihood under a predicted bivariate Gaussian.
    Bivariate,
    /// Mean Euclidean norm of the residual (3D skeleton outputs).
    DirectNorm,
}

/// When graph snapshots are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphCacheMode {
    /// All windows are converted while the dataset is built.
    Eager,
    /// Each window is converted on first access and cached afterwards.
    Lazy,
}

// ---------------------------------------------------------------------------
// TrajectoryConfig
// ---------------------------------------------------------------------------

/// Complete configuration for one dataset / training / evaluation run.
///
/// Defaults match the multi-class Stanford Drone setup: 8 observed and 12
/// predicted frames, six agent classes, coordinates divided by 10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    // -----------------------------------------------------------------------
    // Windows
    // -----------------------------------------------------------------------
    /// Number of observed time-steps. Default: **8**.
    pub obs_len: usize,

    /// Number of predicted time-steps. Default: **12**.
    pub pred_len: usize,

    /// Frame stride between consecutive window starts. Default: **1**.
    pub skip: usize,

    /// A window is kept only if strictly more than this many agents span
    /// it completely. Default: **1**.
    pub min_ped: usize,

    /// Residual threshold above which a track counts as non-linear.
    /// Default: **0.002**.
    pub nonlinear_threshold: f64,

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------
    /// Field delimiter of the scene files. Default: **space**.
    pub delimiter: Delimiter,

    /// Divisor applied to raw coordinates (and multiplied back before
    /// reporting ADE/FDE). Default: **10.0**.
    pub coordinate_scale: f64,

    /// Ordered class labels; the position of a label is its one-hot index.
    pub labels: Vec<String>,

    // -----------------------------------------------------------------------
    // Graph
    // -----------------------------------------------------------------------
    /// Replace each adjacency matrix by its normalized Laplacian.
    /// Default: **true**.
    pub norm_lap_matr: bool,

    /// Edge weighting policy. Default: **inverse distance**.
    pub edge_weighting: EdgeWeighting,

    /// Eager or lazy graph snapshot computation. Default: **eager**.
    pub graph_cache: GraphCacheMode,

    // -----------------------------------------------------------------------
    // Loss / evaluation
    // -----------------------------------------------------------------------
    /// Loss variant. Default: **bivariate**.
    pub loss_kind: LossKind,

    /// Number of samples drawn per window during evaluation (K).
    /// Default: **20**.
    pub num_samples: usize,

    /// Seed for the evaluation sampler and the data loader shuffle.
    /// Default: **42**.
    pub seed: u64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        TrajectoryConfig {
            obs_len: 8,
            pred_len: 12,
            skip: 1,
            min_ped: 1,
            nonlinear_threshold: 0.002,
            delimiter: Delimiter::Space,
            coordinate_scale: 10.0,
            labels: ["Pedestrian", "Biker", "Skater", "Cart", "Car", "Bus"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            norm_lap_matr: true,
            edge_weighting: EdgeWeighting::InverseDistance,
            graph_cache: GraphCacheMode::Eager,
            loss_kind: LossKind::Bivariate,
            num_samples: 20,
            seed: 42,
        }
    }
}

impl TrajectoryConfig {
    /// Total window length, `obs_len + pred_len`.
    pub fn seq_len(&self) -> usize {
        self.obs_len + self.pred_len
    }

    /// Number of classes, i.e. the one-hot vector length.
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// Load a [`TrajectoryConfig`] from a JSON file at `path` and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened,
    /// [`ConfigError::ParseError`] if the JSON is malformed and
    /// [`ConfigError::InvalidValue`] if a field fails validation.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: TrajectoryConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this configuration to pretty-printed JSON and write it to
    /// `path`, creating parent directories if necessary.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Validate all fields and return an error describing the first problem
    /// found, or `Ok(())` if the configuration is coherent.
    ///
    /// # Validated invariants
    ///
    /// - `obs_len` must be at least 1.
    /// - `pred_len` must be at least 3 (the non-linearity fit is quadratic).
    /// - `skip` must be at least 1.
    /// - `nonlinear_threshold` must be finite and non-negative.
    /// - `coordinate_scale` must be finite and strictly positive.
    /// - `labels` must be non-empty, non-blank and unique.
    /// - `num_samples` must be at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.obs_len == 0 {
            return Err(ConfigError::invalid_value("obs_len", "must be > 0"));
        }
        if self.pred_len < 3 {
            return Err(ConfigError::invalid_value(
                "pred_len",
                "must be >= 3 for the quadratic non-linearity fit",
            ));
        }
        if self.skip == 0 {
            return Err(ConfigError::invalid_value("skip", "must be > 0"));
        }
        if !self.nonlinear_threshold.is_finite() || self.nonlinear_threshold < 0.0 {
            return Err(ConfigError::invalid_value(
                "nonlinear_threshold",
                "must be finite and >= 0.0",
            ));
        }
        if !self.coordinate_scale.is_finite() || self.coordinate_scale <= 0.0 {
            return Err(ConfigError::invalid_value(
                "coordinate_scale",
                "must be finite and > 0.0",
            ));
        }

        if self.labels.is_empty() {
            return Err(ConfigError::invalid_value("labels", "at least one label is required"));
        }
        for (i, label) in self.labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(ConfigError::invalid_value("labels", "labels must not be blank"));
            }
            if self.labels[..i].contains(label) {
                return Err(ConfigError::invalid_value(
                    "labels",
                    format!("duplicate label `{label}`"),
                ));
            }
        }

        if self.num_samples == 0 {
            return Err(ConfigError::invalid_value("num_samples", "must be > 0"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
