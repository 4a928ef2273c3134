//! NumPy export of assembled windows.
//!
//! Layout written by [`export_dataset`]:
//!
//! ```text
//! out_dir/
//! ├── manifest.json
//! ├── window_00000/
//! │   ├── obs_traj.npy        [N, 2, obs_len]
//! │   ├── pred_traj.npy       [N, 2, pred_len]
//! │   ├── obs_traj_rel.npy    [N, 2, obs_len]
//! │   ├── pred_traj_rel.npy   [N, 2, pred_len]
//! │   ├── non_linear.npy      [N]
//! │   ├── loss_mask.npy       [N, seq_len]
//! │   ├── classes.npy         [N, C]
//! │   ├── v_obs.npy           [obs_len, N, 2]
//! │   ├── a_obs.npy           [obs_len, N, N]
//! │   ├── v_pred.npy          [pred_len, N, 2]
//! │   └── a_pred.npy          [pred_len, N, N]
//! └── window_00001/ ...
//! ```
//!
//! All arrays are `f32`, so a Python training loop can load a window with
//! `numpy.load` and feed it to a graph network unchanged.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ndarray::Axis;
use ndarray_npy::WriteNpyExt;
use serde::Serialize;
use tracing::info;

use crate::dataset::{DatasetStats, GraphDataset, TrajectoryDataset};
use crate::error::ExportError;

/// File name of the manifest written next to the window directories.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One exported window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedWindow {
    /// Window index.
    pub index: usize,
    /// Directory name relative to the export root.
    pub dir: String,
    /// Number of agents (graph nodes).
    pub num_agents: usize,
}

/// Description of an export, also written as `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ExportManifest {
    /// Source directory of the dataset.
    pub source: PathBuf,
    /// Class labels in one-hot order.
    pub labels: Vec<String>,
    /// Observed steps per window.
    pub obs_len: usize,
    /// Predicted steps per window.
    pub pred_len: usize,
    /// Assembly counters of the dataset.
    pub stats: DatasetStats,
    /// Exported windows in index order.
    pub windows: Vec<ExportedWindow>,
}

fn write_array<T: WriteNpyExt + ?Sized>(dir: &Path, name: &str, array: &T) -> Result<(), ExportError> {
    let path = dir.join(format!("{name}.npy"));
    let file = File::create(&path).map_err(|source| ExportError::Io { path: path.clone(), source })?;
    array
        .write_npy(BufWriter::new(file))
        .map_err(|e| ExportError::Npy { path, message: e.to_string() })
}

/// Write every window of `dataset` under `out_dir` and return the manifest.
///
/// `out_dir` is created if missing; existing window files are overwritten.
///
/// # Errors
///
/// [`ExportError`] on any I/O, `.npy` or manifest failure.
pub fn export_dataset(dataset: &TrajectoryDataset, out_dir: &Path) -> Result<ExportManifest, ExportError> {
    fs::create_dir_all(out_dir)
        .map_err(|source| ExportError::Io { path: out_dir.to_path_buf(), source })?;

    let mut windows = Vec::with_capacity(dataset.len());
    for idx in 0..dataset.len() {
        let sample = dataset.get(idx)?;
        let name = format!("window_{idx:05}");
        let dir = out_dir.join(&name);
        fs::create_dir_all(&dir).map_err(|source| ExportError::Io { path: dir.clone(), source })?;

        write_array(&dir, "obs_traj", &sample.obs_traj)?;
        write_array(&dir, "pred_traj", &sample.pred_traj)?;
        write_array(&dir, "obs_traj_rel", &sample.obs_traj_rel)?;
        write_array(&dir, "pred_traj_rel", &sample.pred_traj_rel)?;
        write_array(&dir, "non_linear", &sample.non_linear)?;
        write_array(&dir, "loss_mask", &sample.loss_mask)?;
        write_array(&dir, "classes", &sample.classes)?;
        write_array(&dir, "v_obs", &sample.graphs.obs.nodes)?;
        write_array(&dir, "a_obs", &sample.graphs.obs.adjacency)?;
        write_array(&dir, "v_pred", &sample.graphs.pred.nodes)?;
        write_array(&dir, "a_pred", &sample.graphs.pred.adjacency)?;

        windows.push(ExportedWindow { index: idx, dir: name, num_agents: sample.num_agents() });
    }

    let manifest = ExportManifest {
        source: dataset.root().to_path_buf(),
        labels: dataset.registry().labels().to_vec(),
        obs_len: dataset.obs_len(),
        pred_len: dataset.pred_traj().len_of(Axis(2)),
        stats: dataset.stats().clone(),
        windows,
    };
    let path = out_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&path, json).map_err(|source| ExportError::Io { path, source })?;

    info!("Exported {} windows to {}", manifest.windows.len(), out_dir.display());
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrajectoryConfig;
    use ndarray::{Array1, Array2, Array3};
    use ndarray_npy::ReadNpyExt;
    use tempfile::tempdir;

    fn dataset(root: &Path) -> TrajectoryDataset {
        let mut text = String::new();
        for f in 0..6 {
            for a in 0..3 {
                let label = if a == 2 { "Biker" } else { "Pedestrian" };
                text.push_str(&format!("{} {a} {} {} {label}\n", f * 10, f * 2 + a, a * 7));
            }
        }
        fs::write(root.join("scene.txt"), text).unwrap();
        let cfg = TrajectoryConfig { obs_len: 2, pred_len: 3, ..TrajectoryConfig::default() };
        TrajectoryDataset::from_dir(root, &cfg).unwrap()
    }

    #[test]
    fn export_writes_every_window() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let ds = dataset(data.path());
        let manifest = export_dataset(&ds, out.path()).unwrap();

        assert_eq!(manifest.windows.len(), ds.len());
        assert_eq!(manifest.obs_len, 2);
        assert_eq!(manifest.pred_len, 3);
        assert!(out.path().join(MANIFEST_FILE).is_file());

        let dir = out.path().join("window_00000");
        let obs: Array3<f32> = Array3::read_npy(File::open(dir.join("obs_traj.npy")).unwrap()).unwrap();
        assert_eq!(obs.shape(), &[3, 2, 2]);
        let a_obs: Array3<f32> = Array3::read_npy(File::open(dir.join("a_obs.npy")).unwrap()).unwrap();
        assert_eq!(a_obs.shape(), &[2, 3, 3]);
        let classes: Array2<f32> = Array2::read_npy(File::open(dir.join("classes.npy")).unwrap()).unwrap();
        assert_eq!(classes.row(2).to_vec(), vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        let nl: Array1<f32> = Array1::read_npy(File::open(dir.join("non_linear.npy")).unwrap()).unwrap();
        assert_eq!(nl.len(), 3);
    }

    #[test]
    fn manifest_lists_labels_and_stats() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let ds = dataset(data.path());
        export_dataset(&ds, out.path()).unwrap();

        let text = fs::read_to_string(out.path().join(MANIFEST_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["labels"][1], "Biker");
        assert_eq!(json["stats"]["windows_kept"], ds.len());
        assert_eq!(json["windows"][0]["dir"], "window_00000");
        assert_eq!(json["windows"][0]["num_agents"], 3);
    }
}
