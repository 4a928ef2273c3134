//! Scene files → sequence windows → graph samples.
//!
//! This module defines the [`GraphDataset`] trait plus its concrete
//! implementation [`TrajectoryDataset`], which scans a directory of per-scene
//! trajectory files and turns them into fixed-length windows of agents that
//! are present for the whole window.
//!
//! A [`DataLoader`] wraps any [`GraphDataset`] and provides batched iteration
//! with optional deterministic shuffle (seeded).
//!
//! # Scene file format
//!
//! One record per line, five fields separated by the configured delimiter:
//!
//! ```text
//! <frame_id> <agent_id> <x> <y> <class_label>
//! 2990 12 1543.5 820.25 Biker
//! 2990 14 310.0 99.75 Pedestrian
//! ```
//!
//! Lines with a different field count, or whose numeric fields do not
//! parse, are skipped and counted in [`DatasetStats::lines_skipped`].
//!
//! # Flat layout
//!
//! All kept agents of all kept windows are stored contiguously; window `i`
//! owns rows `seq_start_end()[i].0 .. seq_start_end()[i].1` of every flat
//! array.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use trajgraph_train::config::TrajectoryConfig;
//! use trajgraph_train::dataset::{GraphDataset, TrajectoryDataset};
//!
//! let cfg = TrajectoryConfig::default();
//! let ds = TrajectoryDataset::from_dir(Path::new("data/train"), &cfg).unwrap();
//! let sample = ds.get(0).unwrap();
//! assert_eq!(sample.model_input().shape()[0], 1);
//! ```

use ndarray::{s, Array1, Array2, Array3, Array4, Axis};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::classes::ClassRegistry;
use crate::config::{Delimiter, GraphCacheMode, TrajectoryConfig};
use crate::error::DatasetError;
use crate::geometry::{non_linearity_flag, relativize, round_to_decimals};
use crate::graph::{GraphBuilder, GraphSequence};

/// Decimal places kept from raw coordinates.
const COORDINATE_DECIMALS: i32 = 4;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One parsed line of a scene file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRecord {
    /// Frame id.
    pub frame: f64,
    /// Agent id, unique within a scene.
    pub agent: f64,
    /// Raw x coordinate.
    pub x: f64,
    /// Raw y coordinate.
    pub y: f64,
    /// Class label as written in the file.
    pub label: String,
}

/// Records of one scene file plus the number of lines that were rejected.
#[derive(Debug, Clone, Default)]
pub struct SceneFile {
    /// Accepted records in file order.
    pub records: Vec<TrajectoryRecord>,
    /// Lines with the wrong field count or an unparseable number.
    pub skipped_lines: usize,
}

/// Parse one scene file.
///
/// # Errors
///
/// [`DatasetError::IoError`] if the file cannot be read.
pub fn read_trajectory_file(path: &Path, delimiter: Delimiter) -> Result<SceneFile, DatasetError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| DatasetError::io_error(path, e))?;
    let mut scene = SceneFile::default();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_record(line, delimiter) {
            Some(record) => scene.records.push(record),
            None => {
                debug!("{}:{}: skipping malformed line", path.display(), line_no + 1);
                scene.skipped_lines += 1;
            }
        }
    }
    Ok(scene)
}

fn parse_record(line: &str, delimiter: Delimiter) -> Option<TrajectoryRecord> {
    let fields = delimiter.split(line);
    if fields.len() != 5 {
        return None;
    }
    let num = |i: usize| fields[i].trim().parse::<f64>().ok();
    Some(TrajectoryRecord {
        frame: num(0)?,
        agent: num(1)?,
        x: num(2)?,
        y: num(3)?,
        label: fields[4].trim().to_string(),
    })
}

// ---------------------------------------------------------------------------
// DatasetStats
// ---------------------------------------------------------------------------

/// Counters collected while a [`TrajectoryDataset`] is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    /// Scene files read.
    pub files_scanned: usize,
    /// Scene files without a single valid record.
    pub files_skipped: usize,
    /// Records accepted across all files.
    pub rows_parsed: usize,
    /// Lines rejected across all files.
    pub lines_skipped: usize,
    /// Window start positions visited.
    pub windows_considered: usize,
    /// Windows with more than `min_ped` complete agents.
    pub windows_kept: usize,
    /// Agents across all kept windows.
    pub agents_kept: usize,
    /// Largest number of distinct agents seen in any visited window.
    pub max_agents_in_window: usize,
    /// Kept agents flagged non-linear.
    pub non_linear_agents: usize,
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// Graph snapshots of one window, split at `obs_len`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGraphs {
    /// Observed part: `V [obs_len, N, 2]`, `A [obs_len, N, N]`.
    pub obs: GraphSequence,
    /// Predicted part: `V [pred_len, N, 2]`, `A [pred_len, N, N]`.
    pub pred: GraphSequence,
}

/// One window with all per-agent arrays and its graph snapshots.
#[derive(Debug, Clone)]
pub struct TrajectorySample {
    /// Window index within the dataset.
    pub index: usize,
    /// Observed absolute positions, `[N, 2, obs_len]`.
    pub obs_traj: Array3<f32>,
    /// Future absolute positions, `[N, 2, pred_len]`.
    pub pred_traj: Array3<f32>,
    /// Observed displacements, `[N, 2, obs_len]`.
    pub obs_traj_rel: Array3<f32>,
    /// Future displacements, `[N, 2, pred_len]`.
    pub pred_traj_rel: Array3<f32>,
    /// Non-linearity flag per agent, `[N]`.
    pub non_linear: Array1<f32>,
    /// Loss mask, `[N, seq_len]`; every kept agent is fully observed.
    pub loss_mask: Array2<f32>,
    /// One-hot classes, `[N, C]`.
    pub classes: Array2<f32>,
    /// Cached graph snapshots, shared with the dataset.
    pub graphs: Arc<WindowGraphs>,
}

impl TrajectorySample {
    /// Number of agents (graph nodes) in this window.
    pub fn num_agents(&self) -> usize {
        self.obs_traj.len_of(Axis(0))
    }

    /// Observed node features as the model expects them, `[1, 2, obs_len, N]`.
    pub fn model_input(&self) -> Array4<f32> {
        self.graphs
            .obs
            .nodes
            .view()
            .permuted_axes([2, 0, 1])
            .insert_axis(Axis(0))
            .as_standard_layout()
            .into_owned()
    }
}

// ---------------------------------------------------------------------------
// GraphDataset trait
// ---------------------------------------------------------------------------

/// Common interface for trajectory graph datasets.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// data-loading threads without additional synchronisation.
pub trait GraphDataset: Send + Sync {
    /// Number of windows.
    fn len(&self) -> usize;

    /// Load the window at position `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::IndexOutOfBounds`] when `idx >= self.len()`.
    fn get(&self, idx: usize) -> Result<TrajectorySample, DatasetError>;

    /// Returns `true` when the dataset contains no windows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// DataLoader
// ---------------------------------------------------------------------------

/// Batched, optionally-shuffled iterator over a [`GraphDataset`].
///
/// The shuffle order is fully deterministic: given the same `seed` and dataset
/// length the iteration order is always identical.
pub struct DataLoader<'a> {
    dataset: &'a dyn GraphDataset,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
}

impl<'a> DataLoader<'a> {
    /// Create a new `DataLoader`.
    ///
    /// # Parameters
    ///
    /// - `dataset`    – the underlying dataset.
    /// - `batch_size` – windows per batch; the last batch may be smaller.
    /// - `shuffle`    – shuffle deterministically with `seed` on each `iter()`.
    /// - `seed`       – fixed seed for the shuffle.
    pub fn new(dataset: &'a dyn GraphDataset, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        DataLoader { dataset, batch_size, shuffle, seed }
    }

    /// Number of complete (or partial) batches yielded per epoch.
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Return an iterator that yields `Vec<TrajectorySample>` batches.
    ///
    /// Failed individual sample loads are skipped with a `warn!` log rather
    /// than aborting the iterator.
    pub fn iter(&self) -> DataLoaderIter<'_> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            xorshift_shuffle(&mut indices, self.seed);
        }
        DataLoaderIter {
            dataset: self.dataset,
            indices,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// Iterator returned by [`DataLoader::iter`].
pub struct DataLoaderIter<'a> {
    dataset: &'a dyn GraphDataset,
    indices: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Vec<TrajectorySample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.indices.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.indices.len());
        let batch_indices = &self.indices[self.cursor..end];
        self.cursor = end;

        let mut batch = Vec::with_capacity(batch_indices.len());
        for &idx in batch_indices {
            match self.dataset.get(idx) {
                Ok(sample) => batch.push(sample),
                Err(e) => warn!("Skipping window {idx}: {e}"),
            }
        }
        if batch.is_empty() { None } else { Some(batch) }
    }
}

/// In-place Fisher-Yates shuffle driven by a 64-bit Xorshift PRNG.
fn xorshift_shuffle(indices: &mut [usize], seed: u64) {
    let n = indices.len();
    if n <= 1 {
        return;
    }
    let mut state = if seed == 0 { 0x853c49e6748fea9b } else { seed };
    for i in (1..n).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state as usize) % (i + 1);
        indices.swap(i, j);
    }
}

// ---------------------------------------------------------------------------
// Window assembly
// ---------------------------------------------------------------------------

/// A complete agent track inside one window.
struct AgentTrack {
    /// Scaled absolute positions, `[2, seq_len]`.
    abs: Array2<f64>,
    /// Displacements, `[2, seq_len]`.
    rel: Array2<f64>,
    class_idx: usize,
    non_linear: f32,
}

/// Window parameters shared by every scene of one build.
struct WindowRules<'c> {
    seq_len: usize,
    pred_len: usize,
    skip: usize,
    min_ped: usize,
    threshold: f64,
    scale: f64,
    registry: &'c ClassRegistry,
}

/// `ceil(n / d)` for a positive divisor, correct for negative `n`.
fn ceil_div(n: i64, d: i64) -> i64 {
    let q = n / d;
    if n % d != 0 && n > 0 { q + 1 } else { q }
}

impl WindowRules<'_> {
    /// Slide over one scene and return the tracks of every kept window.
    fn windows(
        &self,
        path: &Path,
        records: &[TrajectoryRecord],
        stats: &mut DatasetStats,
    ) -> Result<Vec<Vec<AgentTrack>>, DatasetError> {
        let mut frames: Vec<f64> = records.iter().map(|r| r.frame).collect();
        frames.sort_by(f64::total_cmp);
        frames.dedup_by(|a, b| a.total_cmp(b).is_eq());

        let mut frame_rows: Vec<Vec<&TrajectoryRecord>> = vec![Vec::new(); frames.len()];
        for r in records {
            if let Ok(i) = frames.binary_search_by(|f| f.total_cmp(&r.frame)) {
                frame_rows[i].push(r);
            }
        }

        let num_frames = frames.len();
        let num_windows =
            ceil_div(num_frames as i64 - self.seq_len as i64 + 1, self.skip as i64);
        let bound = num_windows * self.skip as i64 + 1;

        let mut kept = Vec::new();
        let mut start = 0usize;
        while (start as i64) < bound {
            stats.windows_considered += 1;
            let tracks = self.window_tracks(path, &frame_rows, start, stats)?;
            if tracks.len() > self.min_ped {
                kept.push(tracks);
            }
            start += self.skip;
        }
        Ok(kept)
    }

    /// Complete agent tracks of the window starting at frame index `start`.
    fn window_tracks(
        &self,
        path: &Path,
        frame_rows: &[Vec<&TrajectoryRecord>],
        start: usize,
        stats: &mut DatasetStats,
    ) -> Result<Vec<AgentTrack>, DatasetError> {
        if start >= frame_rows.len() {
            return Ok(Vec::new());
        }
        let end = (start + self.seq_len).min(frame_rows.len());

        // (frame offset within the window, record), in window order.
        let rows: Vec<(usize, &TrajectoryRecord)> = (start..end)
            .flat_map(|f| frame_rows[f].iter().map(move |r| (f - start, *r)))
            .collect();

        let mut agents: Vec<f64> = rows.iter().map(|(_, r)| r.agent).collect();
        agents.sort_by(f64::total_cmp);
        agents.dedup_by(|a, b| a.total_cmp(b).is_eq());
        stats.max_agents_in_window = stats.max_agents_in_window.max(agents.len());

        let mut tracks = Vec::new();
        for agent in agents {
            let track: Vec<&(usize, &TrajectoryRecord)> =
                rows.iter().filter(|(_, r)| r.agent.total_cmp(&agent).is_eq()).collect();
            let (Some(first), Some(last)) = (track.first(), track.last()) else {
                continue;
            };

            let label = &first.1.label;
            let class_idx = self.registry.index_of(label).ok_or_else(|| {
                DatasetError::UnknownClass { path: path.to_path_buf(), label: label.clone() }
            })?;

            let pad_front = first.0;
            let pad_end = last.0 + 1;
            if track.len() != self.seq_len || pad_end - pad_front != self.seq_len {
                continue;
            }

            let abs = Array2::from_shape_fn((2, self.seq_len), |(c, t)| {
                let r = track[t].1;
                let raw = if c == 0 { r.x } else { r.y };
                round_to_decimals(raw, COORDINATE_DECIMALS) / self.scale
            });
            let rel = relativize(abs.view());
            let non_linear = non_linearity_flag(abs.view(), self.pred_len, self.threshold)?;
            tracks.push(AgentTrack { abs, rel, class_idx, non_linear });
        }
        Ok(tracks)
    }
}

// ---------------------------------------------------------------------------
// TrajectoryDataset
// ---------------------------------------------------------------------------

/// Windows of complete agent tracks read from a directory of scene files.
///
/// Built once by [`TrajectoryDataset::from_dir`] and immutable afterwards.
/// Graph snapshots are computed at construction ([`GraphCacheMode::Eager`],
/// in parallel across windows) or on first access ([`GraphCacheMode::Lazy`]);
/// either way each window is converted exactly once.
pub struct TrajectoryDataset {
    root: PathBuf,
    obs_len: usize,
    builder: GraphBuilder,
    registry: ClassRegistry,
    obs_traj: Array3<f32>,
    pred_traj: Array3<f32>,
    obs_traj_rel: Array3<f32>,
    pred_traj_rel: Array3<f32>,
    non_linear: Array1<f32>,
    loss_mask: Array2<f32>,
    classes: Array2<f32>,
    seq_start_end: Vec<(usize, usize)>,
    cache: Vec<OnceLock<Arc<WindowGraphs>>>,
    stats: DatasetStats,
}

impl TrajectoryDataset {
    /// Scan `dir` (files sorted by name) and assemble all kept windows.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::InvalidConfig`] if `config` fails validation.
    /// - [`DatasetError::DirectoryNotFound`] if `dir` does not exist.
    /// - [`DatasetError::IoError`] for unreadable files.
    /// - [`DatasetError::UnknownClass`] for a label missing from `config.labels`.
    /// - [`DatasetError::EmptyDataset`] if no window survives filtering.
    pub fn from_dir(dir: &Path, config: &TrajectoryConfig) -> Result<Self, DatasetError> {
        config.validate()?;
        if !dir.is_dir() {
            return Err(DatasetError::DirectoryNotFound { path: dir.to_path_buf() });
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| DatasetError::io_error(dir, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        files.sort();

        let registry = ClassRegistry::from_config(config);
        let rules = WindowRules {
            seq_len: config.seq_len(),
            pred_len: config.pred_len,
            skip: config.skip,
            min_ped: config.min_ped,
            threshold: config.nonlinear_threshold,
            scale: config.coordinate_scale,
            registry: &registry,
        };

        let mut stats = DatasetStats::default();
        let mut windows: Vec<Vec<AgentTrack>> = Vec::new();
        for path in &files {
            stats.files_scanned += 1;
            let scene = read_trajectory_file(path, config.delimiter)?;
            stats.lines_skipped += scene.skipped_lines;
            if scene.records.is_empty() {
                warn!("{}: no data in file, skipping", path.display());
                stats.files_skipped += 1;
                continue;
            }
            stats.rows_parsed += scene.records.len();

            let before = windows.len();
            windows.extend(rules.windows(path, &scene.records, &mut stats)?);
            debug!(
                "{}: {} records, {} windows kept",
                path.display(),
                scene.records.len(),
                windows.len() - before
            );
        }

        if windows.is_empty() {
            return Err(DatasetError::EmptyDataset { path: dir.to_path_buf(), min_ped: config.min_ped });
        }

        let mut ds = Self::assemble(dir, config, registry, windows, stats);
        ds.cache = match config.graph_cache {
            GraphCacheMode::Eager => {
                let graphs: Vec<Arc<WindowGraphs>> = (0..ds.seq_start_end.len())
                    .into_par_iter()
                    .map(|i| Arc::new(ds.compute_graphs(i)))
                    .collect();
                graphs.into_iter().map(OnceLock::from).collect()
            }
            GraphCacheMode::Lazy => (0..ds.seq_start_end.len()).map(|_| OnceLock::new()).collect(),
        };

        info!(
            "TrajectoryDataset: {} files, {} windows, {} agents (max {} per window, {} non-linear), root={}",
            ds.stats.files_scanned,
            ds.stats.windows_kept,
            ds.stats.agents_kept,
            ds.stats.max_agents_in_window,
            ds.stats.non_linear_agents,
            dir.display()
        );
        Ok(ds)
    }

    /// Copy per-window tracks into the flat arrays.
    fn assemble(
        dir: &Path,
        config: &TrajectoryConfig,
        registry: ClassRegistry,
        windows: Vec<Vec<AgentTrack>>,
        mut stats: DatasetStats,
    ) -> Self {
        let obs_len = config.obs_len;
        let pred_len = config.pred_len;
        let seq_len = config.seq_len();
        let total: usize = windows.iter().map(Vec::len).sum();

        let mut obs_traj = Array3::<f32>::zeros((total, 2, obs_len));
        let mut pred_traj = Array3::<f32>::zeros((total, 2, pred_len));
        let mut obs_traj_rel = Array3::<f32>::zeros((total, 2, obs_len));
        let mut pred_traj_rel = Array3::<f32>::zeros((total, 2, pred_len));
        let mut non_linear = Array1::<f32>::zeros(total);
        let mut classes = Array2::<f32>::zeros((total, registry.len()));
        let mut seq_start_end = Vec::with_capacity(windows.len());

        let mut row = 0usize;
        for tracks in &windows {
            let start = row;
            for track in tracks {
                let abs = track.abs.mapv(|v| v as f32);
                let rel = track.rel.mapv(|v| v as f32);
                obs_traj.slice_mut(s![row, .., ..]).assign(&abs.slice(s![.., ..obs_len]));
                pred_traj.slice_mut(s![row, .., ..]).assign(&abs.slice(s![.., obs_len..]));
                obs_traj_rel.slice_mut(s![row, .., ..]).assign(&rel.slice(s![.., ..obs_len]));
                pred_traj_rel.slice_mut(s![row, .., ..]).assign(&rel.slice(s![.., obs_len..]));
                non_linear[row] = track.non_linear;
                classes[[row, track.class_idx]] = 1.0;
                row += 1;
            }
            seq_start_end.push((start, row));
        }

        stats.windows_kept = windows.len();
        stats.agents_kept = total;
        stats.non_linear_agents = non_linear.iter().filter(|&&v| v > 0.0).count();

        TrajectoryDataset {
            root: dir.to_path_buf(),
            obs_len,
            builder: GraphBuilder::from_config(config),
            registry,
            obs_traj,
            pred_traj,
            obs_traj_rel,
            pred_traj_rel,
            non_linear,
            loss_mask: Array2::ones((total, seq_len)),
            classes,
            seq_start_end,
            cache: Vec::new(),
            stats,
        }
    }

    fn compute_graphs(&self, idx: usize) -> WindowGraphs {
        let (start, end) = self.seq_start_end[idx];
        WindowGraphs {
            obs: self
                .builder
                .build_from_relative(self.obs_traj_rel.slice(s![start..end, .., ..])),
            pred: self
                .builder
                .build_from_relative(self.pred_traj_rel.slice(s![start..end, .., ..])),
        }
    }

    /// Graph snapshots of window `idx`, computing them on first access.
    pub fn graphs(&self, idx: usize) -> Result<Arc<WindowGraphs>, DatasetError> {
        let slot = self
            .cache
            .get(idx)
            .ok_or(DatasetError::IndexOutOfBounds { idx, len: self.len() })?;
        Ok(Arc::clone(slot.get_or_init(|| Arc::new(self.compute_graphs(idx)))))
    }

    /// `(start, end)` row offsets of every window into the flat arrays.
    pub fn seq_start_end(&self) -> &[(usize, usize)] {
        &self.seq_start_end
    }

    /// Assembly counters.
    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    /// Class registry used to encode labels.
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Directory the dataset was read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of observed time-steps per window.
    pub fn obs_len(&self) -> usize {
        self.obs_len
    }

    /// All observed absolute positions, `[agents, 2, obs_len]`.
    pub fn obs_traj(&self) -> &Array3<f32> {
        &self.obs_traj
    }

    /// All future absolute positions, `[agents, 2, pred_len]`.
    pub fn pred_traj(&self) -> &Array3<f32> {
        &self.pred_traj
    }

    /// All one-hot classes, `[agents, C]`.
    pub fn classes(&self) -> &Array2<f32> {
        &self.classes
    }

    /// All non-linearity flags, `[agents]`.
    pub fn non_linear(&self) -> &Array1<f32> {
        &self.non_linear
    }
}

impl std::fmt::Debug for TrajectoryDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrajectoryDataset")
            .field("root", &self.root)
            .field("obs_len", &self.obs_len)
            .field("windows", &self.seq_start_end.len())
            .field("agents", &self.non_linear.len())
            .field("cached_graphs", &self.cache.iter().filter(|c| c.get().is_some()).count())
            .field("stats", &self.stats)
            .finish()
    }
}

impl GraphDataset for TrajectoryDataset {
    fn len(&self) -> usize {
        self.seq_start_end.len()
    }

    fn get(&self, idx: usize) -> Result<TrajectorySample, DatasetError> {
        let (start, end) = *self
            .seq_start_end
            .get(idx)
            .ok_or(DatasetError::IndexOutOfBounds { idx, len: self.len() })?;
        let graphs = self.graphs(idx)?;
        Ok(TrajectorySample {
            index: idx,
            obs_traj: self.obs_traj.slice(s![start..end, .., ..]).to_owned(),
            pred_traj: self.pred_traj.slice(s![start..end, .., ..]).to_owned(),
            obs_traj_rel: self.obs_traj_rel.slice(s![start..end, .., ..]).to_owned(),
            pred_traj_rel: self.pred_traj_rel.slice(s![start..end, .., ..]).to_owned(),
            non_linear: self.non_linear.slice(s![start..end]).to_owned(),
            loss_mask: self.loss_mask.slice(s![start..end, ..]).to_owned(),
            classes: self.classes.slice(s![start..end, ..]).to_owned(),
            graphs,
        })
    }

    fn name(&self) -> &str {
        "TrajectoryDataset"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
