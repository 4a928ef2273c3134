//! Error types for the trajectory graph pipeline.
//!
//! Every module that produces an error imports its error type from here
//! rather than defining it inline, keeping the hierarchy in one place.
//!
//! ## Hierarchy
//!
//! ```text
//! TrainError (top-level)
//! ├── ConfigError    (config validation / file loading, class weight files)
//! ├── DatasetError   (scene parsing, window assembly, sample access)
//! ├── GeometryError  (polynomial fit preconditions)
//! ├── GraphError     (graph builder input shapes)
//! ├── LossError      (loss shapes, class reweighting)
//! ├── MetricsError   (ADE / FDE inputs)
//! └── ExportError    (NumPy export)
//! ```
//!
//! Per-record anomalies (malformed lines, incomplete tracks, empty scene
//! files) are not errors: the dataset absorbs them and they only show up in
//! [`crate::dataset::DatasetStats`].

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// TrainResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias used by orchestration-level functions.
pub type TrainResult<T> = Result<T, TrainError>;

// ---------------------------------------------------------------------------
// TrainError (top-level aggregator)
// ---------------------------------------------------------------------------

/// Top-level error type for the trajectory graph pipeline.
///
/// Orchestration-level functions (e.g. [`crate::eval::Evaluator`] methods)
/// return `TrainResult<T>`. Lower-level functions return their own
/// module-specific error types which coerce into `TrainError` via [`From`].
#[derive(Debug, Error)]
pub enum TrainError {
    /// A configuration validation or loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A dataset loading or access error.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// A graph construction error.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A loss computation error.
    #[error("Loss error: {0}")]
    Loss(#[from] LossError),

    /// A metric computation error.
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// An export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// The model returned a tensor whose shape violates the model contract.
    #[error("Model output shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// The external model failed to produce a prediction.
    #[error("Model forward pass failed: {0}")]
    Model(String),
}

impl TrainError {
    /// Construct a [`TrainError::ShapeMismatch`].
    pub fn shape_mismatch(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        TrainError::ShapeMismatch { expected, actual }
    }

    /// Construct a [`TrainError::Model`].
    pub fn model<S: Into<String>>(msg: S) -> Self {
        TrainError::Model(msg.into())
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a [`TrajectoryConfig`] or a
/// class weight file.
///
/// [`TrajectoryConfig`]: crate::config::TrajectoryConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read from (or written to) disk.
    #[error("Cannot access config file `{path}`: {source}")]
    FileRead {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    ParseError {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A class weight file has no weight for a configured label.
    #[error("No class weight for label `{label}`")]
    MissingClassWeight {
        /// The label without a weight.
        label: String,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// DatasetError
// ---------------------------------------------------------------------------

/// Errors produced while assembling or accessing trajectory windows.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The data directory does not exist.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A low-level I/O error while reading a scene file.
    #[error("I/O error reading `{path}`: {source}")]
    IoError {
        /// Path being read when the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A record carries a class label that is not configured.
    #[error("Unknown class label `{label}` in `{path}`")]
    UnknownClass {
        /// Scene file containing the label.
        path: PathBuf,
        /// The unknown label.
        label: String,
    },

    /// No window survived filtering; nothing can be trained or evaluated.
    #[error(
        "No data: no sequence window with more than {min_ped} complete agents in `{path}`"
    )]
    EmptyDataset {
        /// Directory that was scanned.
        path: PathBuf,
        /// The configured minimum agent count.
        min_ped: usize,
    },

    /// A sample index is out of bounds.
    #[error("Index {idx} out of bounds (dataset has {len} samples)")]
    IndexOutOfBounds {
        /// The requested index.
        idx: usize,
        /// Total length of the dataset.
        len: usize,
    },

    /// The non-linearity test could not be evaluated for a track.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// The configuration handed to the dataset failed validation.
    #[error("Invalid dataset configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl DatasetError {
    /// Construct a [`DatasetError::IoError`].
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::IoError { path: path.into(), source }
    }
}

// ---------------------------------------------------------------------------
// GeometryError
// ---------------------------------------------------------------------------

/// Errors produced by the geometry helpers.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A quadratic fit needs at least three points.
    #[error("Polynomial fit needs at least 3 points, got {got}")]
    TooFewPoints {
        /// Number of points supplied.
        got: usize,
    },

    /// The fit window is longer than the track.
    #[error("Fit window of {window} points exceeds track length {len}")]
    WindowTooLong {
        /// Requested window length.
        window: usize,
        /// Available track length.
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// GraphError
// ---------------------------------------------------------------------------

/// Errors produced by [`crate::graph::GraphBuilder`].
#[derive(Debug, Error)]
pub enum GraphError {
    /// Absolute and relative sequences disagree in shape, or are not
    /// `[agents, 2, T]`.
    #[error("Graph input shape mismatch: absolute {absolute:?}, relative {relative:?}")]
    ShapeMismatch {
        /// Shape of the absolute sequence.
        absolute: Vec<usize>,
        /// Shape of the relative sequence.
        relative: Vec<usize>,
    },

    /// An adjacency matrix handed to the Laplacian is not square.
    #[error("Adjacency matrix must be square, got {rows}x{cols}")]
    NotSquare {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
    },
}

// ---------------------------------------------------------------------------
// LossError
// ---------------------------------------------------------------------------

/// Errors produced by the loss engine.
#[derive(Debug, Error)]
pub enum LossError {
    /// Prediction and target tensors are incompatible.
    #[error("Loss shape mismatch: prediction {prediction:?}, target {target:?}")]
    ShapeMismatch {
        /// Prediction shape.
        prediction: Vec<usize>,
        /// Target shape.
        target: Vec<usize>,
    },

    /// The batch carries no nodes, so the class mix is undefined.
    #[error("Cannot reweight an empty batch (zero nodes)")]
    EmptyBatch,

    /// A class row is not a one-hot vector of the configured length.
    #[error("Row {row} is not a valid one-hot class vector: {values:?}")]
    InvalidOneHot {
        /// Node index of the offending row.
        row: usize,
        /// The row contents.
        values: Vec<f32>,
    },

    /// Fewer weights than classes.
    #[error("Expected {expected} class weights, got {actual}")]
    WeightCountMismatch {
        /// Number of classes.
        expected: usize,
        /// Number of weights supplied.
        actual: usize,
    },
}

// ---------------------------------------------------------------------------
// MetricsError
// ---------------------------------------------------------------------------

/// Errors produced by ADE / FDE computation.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// No scenes were supplied.
    #[error("Displacement metrics need at least one scene")]
    NoScenes,

    /// Prediction, target and count lists have different lengths.
    #[error("Scene count mismatch: {predictions} predictions, {targets} targets, {counts} counts")]
    SceneCountMismatch {
        /// Number of prediction scenes.
        predictions: usize,
        /// Number of target scenes.
        targets: usize,
        /// Number of agent counts.
        counts: usize,
    },

    /// A scene's prediction and target disagree in shape, or are not `[T, N, 2]`.
    #[error("Scene {scene}: prediction {prediction:?} vs target {target:?}")]
    ShapeMismatch {
        /// Scene index.
        scene: usize,
        /// Prediction shape.
        prediction: Vec<usize>,
        /// Target shape.
        target: Vec<usize>,
    },

    /// A scene's agent count is zero or exceeds the tensor's agent axis.
    #[error("Scene {scene}: invalid agent count {count} (tensor has {available} agents, {steps} steps)")]
    InvalidCount {
        /// Scene index.
        scene: usize,
        /// Requested agent count.
        count: usize,
        /// Agents available in the tensor.
        available: usize,
        /// Timesteps available in the tensor.
        steps: usize,
    },

    /// Relative nodes and their origins disagree in agent count, or are not
    /// 2-D points.
    #[error("Cannot reconstruct absolute nodes {nodes:?} from origin {origin:?}")]
    OriginMismatch {
        /// Shape of the relative node tensor.
        nodes: Vec<usize>,
        /// Shape of the origin matrix.
        origin: Vec<usize>,
    },
}

// ---------------------------------------------------------------------------
// ExportError
// ---------------------------------------------------------------------------

/// Errors produced by [`crate::export`].
#[derive(Debug, Error)]
pub enum ExportError {
    /// A directory or file could not be created.
    #[error("I/O error writing `{path}`: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An array could not be serialised to `.npy`.
    #[error("NumPy write error in `{path}`: {message}")]
    Npy {
        /// Path of the `.npy` file.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// The manifest could not be serialised.
    #[error("Manifest serialisation failed: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Reading a sample back from the dataset failed.
    #[error("Dataset error during export: {0}")]
    Dataset(#[from] DatasetError),
}
