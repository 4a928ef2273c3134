//! Sampling-based evaluation and validation loss.
//!
//! For every window of a dataset the [`Evaluator`]
//!
//! 1. runs the model on the observed graphs,
//! 2. draws K displacement samples from the predicted bivariate Gaussians,
//! 3. reconstructs absolute positions starting from the last observed one,
//! 4. scales back to raw coordinate units and scores each agent per sample,
//!
//! then keeps each agent's best and mean error over the K samples and
//! averages over all agents of the dataset.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use trajgraph_train::config::TrajectoryConfig;
//! use trajgraph_train::dataset::TrajectoryDataset;
//! use trajgraph_train::eval::Evaluator;
//! use trajgraph_train::model::ConstantVelocityModel;
//!
//! let cfg = TrajectoryConfig::default();
//! let ds = TrajectoryDataset::from_dir(Path::new("data/test"), &cfg).unwrap();
//! let model = ConstantVelocityModel::bivariate(cfg.pred_len, 0.1);
//! let report = Evaluator::new(&cfg).evaluate(&model, &ds).unwrap();
//! println!("{}", report.metrics.summary());
//! ```

use ndarray::{s, Array3, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::TrajectoryConfig;
use crate::dataset::{GraphDataset, TrajectorySample};
use crate::error::{LossError, MetricsError, TrainError, TrainResult};
use crate::losses::{GraphLoss, BIVARIATE_PARAMS};
use crate::metrics::{
    ade, fde, relative_to_absolute, sample_displacements, DisplacementAccumulator, EvalMetrics,
};
use crate::model::TrajectoryModel;

/// Absolute trajectories of one window, in scaled coordinates.
#[derive(Debug, Clone)]
pub struct WindowTrajectories {
    /// Window index in the dataset.
    pub index: usize,
    /// Observed positions, `[T_obs, N, 2]`.
    pub obs: Array3<f64>,
    /// Ground-truth future positions, `[T_pred, N, 2]`.
    pub target: Array3<f64>,
    /// One `[T_pred, N, 2]` array per drawn sample.
    pub samples: Vec<Array3<f64>>,
}

/// Result of [`Evaluator::evaluate`].
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Aggregated best-of-K / mean-of-K metrics.
    pub metrics: EvalMetrics,
    /// Per-window trajectories, empty unless requested.
    pub trajectories: Vec<WindowTrajectories>,
}

/// Runs a [`TrajectoryModel`] over a [`GraphDataset`] and scores it.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pred_len: usize,
    num_samples: usize,
    seed: u64,
    scale: f64,
    keep_trajectories: bool,
}

impl Evaluator {
    /// Evaluator with K, seed and coordinate scale taken from `config`.
    pub fn new(config: &TrajectoryConfig) -> Self {
        Evaluator {
            pred_len: config.pred_len,
            num_samples: config.num_samples,
            seed: config.seed,
            scale: config.coordinate_scale,
            keep_trajectories: false,
        }
    }

    /// Retain reconstructed trajectories in the report.
    pub fn with_trajectories(mut self, keep: bool) -> Self {
        self.keep_trajectories = keep;
        self
    }

    /// Forward one window and check the output layout.
    fn predict(
        &self,
        model: &dyn TrajectoryModel,
        sample: &TrajectorySample,
        min_channels: usize,
    ) -> TrainResult<Array3<f32>> {
        let pred = model.forward(
            sample.model_input().view(),
            sample.graphs.obs.adjacency.view(),
            sample.classes.view(),
        )?;
        let (steps, agents, channels) = pred.dim();
        if steps != self.pred_len || agents != sample.num_agents() || channels < min_channels {
            return Err(TrainError::shape_mismatch(
                vec![self.pred_len, sample.num_agents(), min_channels],
                pred.shape().to_vec(),
            ));
        }
        Ok(pred)
    }

    /// Best-of-K and mean-of-K ADE/FDE of `model` over every window.
    ///
    /// # Errors
    ///
    /// Propagates dataset and model failures; returns
    /// [`TrainError::ShapeMismatch`] for a model output that is not
    /// `[pred_len, N, ≥5]` and [`MetricsError::NoScenes`] for an empty dataset.
    pub fn evaluate(
        &self,
        model: &dyn TrajectoryModel,
        dataset: &dyn GraphDataset,
    ) -> TrainResult<EvalReport> {
        info!(
            "Evaluating {} on {} ({} windows, K={})",
            model.name(),
            dataset.name(),
            dataset.len(),
            self.num_samples
        );
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut acc = DisplacementAccumulator::new();
        let mut trajectories = Vec::new();

        for idx in 0..dataset.len() {
            let sample = dataset.get(idx)?;
            let pred = self.predict(model, &sample, BIVARIATE_PARAMS)?;

            // [N, 2, T] → [T, N, 2]
            let v_x = sample.obs_traj.view().permuted_axes([2, 0, 1]).mapv(f64::from);
            let first = v_x.index_axis(Axis(0), 0);
            let last = v_x.index_axis(Axis(0), v_x.len_of(Axis(0)) - 1);

            let obs = relative_to_absolute(sample.graphs.obs.nodes.mapv(f64::from).view(), first)?;
            let target =
                relative_to_absolute(sample.graphs.pred.nodes.mapv(f64::from).view(), last)?;
            let target_scaled = &target * self.scale;

            let agents = sample.num_agents();
            let mut ade_k = vec![Vec::with_capacity(self.num_samples); agents];
            let mut fde_k = vec![Vec::with_capacity(self.num_samples); agents];
            let mut samples = Vec::new();

            for _ in 0..self.num_samples {
                let displacement = sample_displacements(pred.view(), &mut rng);
                let abs = relative_to_absolute(displacement.view(), last)?;
                let abs_scaled = &abs * self.scale;
                for n in 0..agents {
                    let p = [abs_scaled.slice(s![.., n..n + 1, ..])];
                    let t = [target_scaled.slice(s![.., n..n + 1, ..])];
                    ade_k[n].push(ade(&p, &t, &[1])?);
                    fde_k[n].push(fde(&p, &t, &[1])?);
                }
                if self.keep_trajectories {
                    samples.push(abs);
                }
            }

            for n in 0..agents {
                acc.push_agent(&ade_k[n], &fde_k[n]);
            }
            debug!("window {idx}: {agents} agents scored");

            if self.keep_trajectories {
                trajectories.push(WindowTrajectories { index: idx, obs, target, samples });
            }
        }

        let metrics = acc.finalize().ok_or(MetricsError::NoScenes)?;
        info!("{}: {}", model.name(), metrics.summary());
        Ok(EvalReport { metrics, trajectories })
    }

    /// Mean reweighted loss of `model` over every window of `dataset`.
    ///
    /// # Errors
    ///
    /// Propagates dataset, model and loss failures; an empty dataset yields
    /// [`LossError::EmptyBatch`].
    pub fn validation_loss(
        &self,
        model: &dyn TrajectoryModel,
        dataset: &dyn GraphDataset,
        loss: &GraphLoss,
    ) -> TrainResult<f64> {
        if dataset.is_empty() {
            return Err(LossError::EmptyBatch.into());
        }
        let mut sum = 0.0;
        for idx in 0..dataset.len() {
            let sample = dataset.get(idx)?;
            let pred = self.predict(model, &sample, 1)?;
            let target: ArrayView3<'_, f32> = sample.graphs.pred.nodes.view();
            let breakdown = loss.compute(pred.view(), target, sample.classes.view())?;
            sum += breakdown.total;
        }
        let mean = sum / dataset.len() as f64;
        info!("{} validation loss on {}: {mean:.6}", model.name(), dataset.name());
        Ok(mean)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
