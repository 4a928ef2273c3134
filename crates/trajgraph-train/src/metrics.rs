//! Displacement metrics for trajectory prediction.
//!
//! This module provides:
//!
//! - **ADE** (Average Displacement Error): mean Euclidean distance between
//!   predicted and true positions over every agent and future step.
//! - **FDE** (Final Displacement Error): the same at the last future step.
//! - Reconstruction of absolute positions from per-step displacements.
//! - Sampling from the per-node bivariate Gaussians a model predicts.
//!
//! Stochastic predictions are scored best-of-K and mean-of-K per agent; the
//! per-agent values are collected in a [`DisplacementAccumulator`] and
//! finalized into [`EvalMetrics`].

use ndarray::{Array3, ArrayView2, ArrayView3};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;

use crate::error::MetricsError;
use crate::geometry::euclidean;

// ---------------------------------------------------------------------------
// ADE / FDE
// ---------------------------------------------------------------------------

/// Shared input checks of [`ade`] and [`fde`].
fn check_scenes(
    preds: &[ArrayView3<'_, f64>],
    targets: &[ArrayView3<'_, f64>],
    counts: &[usize],
) -> Result<(), MetricsError> {
    if preds.len() != targets.len() || preds.len() != counts.len() {
        return Err(MetricsError::SceneCountMismatch {
            predictions: preds.len(),
            targets: targets.len(),
            counts: counts.len(),
        });
    }
    if preds.is_empty() {
        return Err(MetricsError::NoScenes);
    }
    for (scene, ((p, t), &count)) in preds.iter().zip(targets).zip(counts).enumerate() {
        if p.shape() != t.shape() || p.shape()[2] != 2 {
            return Err(MetricsError::ShapeMismatch {
                scene,
                prediction: p.shape().to_vec(),
                target: t.shape().to_vec(),
            });
        }
        let (steps, available, _) = p.dim();
        if count == 0 || count > available || steps == 0 {
            return Err(MetricsError::InvalidCount { scene, count, available, steps });
        }
    }
    Ok(())
}

#[inline]
fn distance_at(p: &ArrayView3<'_, f64>, t: &ArrayView3<'_, f64>, s: usize, i: usize) -> f64 {
    euclidean([p[[s, i, 0]], p[[s, i, 1]]], [t[[s, i, 0]], t[[s, i, 1]]])
}

/// Average Displacement Error.
///
/// Every scene is `[T, N, 2]`; only its first `counts[s]` agents are scored.
/// The per-scene error is `Σ_i Σ_t ‖pred − target‖ / (count · T)` and the
/// result is the mean over scenes.
///
/// # Errors
///
/// [`MetricsError`] when the inputs are empty, of different lengths or
/// shapes, or a count is zero or exceeds the agent axis.
pub fn ade(
    preds: &[ArrayView3<'_, f64>],
    targets: &[ArrayView3<'_, f64>],
    counts: &[usize],
) -> Result<f64, MetricsError> {
    check_scenes(preds, targets, counts)?;
    let mut sum_all = 0.0;
    for ((p, t), &count) in preds.iter().zip(targets).zip(counts) {
        let steps = p.dim().0;
        let mut sum = 0.0;
        for i in 0..count {
            for s in 0..steps {
                sum += distance_at(p, t, s, i);
            }
        }
        sum_all += sum / (count * steps) as f64;
    }
    Ok(sum_all / preds.len() as f64)
}

/// Final Displacement Error: like [`ade`] but only at the last step,
/// averaged over the scored agents.
///
/// # Errors
///
/// Same conditions as [`ade`].
pub fn fde(
    preds: &[ArrayView3<'_, f64>],
    targets: &[ArrayView3<'_, f64>],
    counts: &[usize],
) -> Result<f64, MetricsError> {
    check_scenes(preds, targets, counts)?;
    let mut sum_all = 0.0;
    for ((p, t), &count) in preds.iter().zip(targets).zip(counts) {
        let last = p.dim().0 - 1;
        let sum: f64 = (0..count).map(|i| distance_at(p, t, last, i)).sum();
        sum_all += sum / count as f64;
    }
    Ok(sum_all / preds.len() as f64)
}

/// Reconstruct absolute nodes: `out[s, i] = origin[i] + Σ_{k ≤ s} nodes[k, i]`.
///
/// # Errors
///
/// [`MetricsError::OriginMismatch`] unless `nodes` is `[T, N, 2]` and
/// `origin` is `[N, 2]`.
pub fn relative_to_absolute(
    nodes: ArrayView3<'_, f64>,
    origin: ArrayView2<'_, f64>,
) -> Result<Array3<f64>, MetricsError> {
    let (steps, agents, dims) = nodes.dim();
    if dims != 2 || origin.dim() != (agents, 2) {
        return Err(MetricsError::OriginMismatch {
            nodes: nodes.shape().to_vec(),
            origin: origin.shape().to_vec(),
        });
    }
    let mut out = Array3::zeros((steps, agents, 2));
    for i in 0..agents {
        for c in 0..2 {
            let mut acc = origin[[i, c]];
            for s in 0..steps {
                acc += nodes[[s, i, c]];
                out[[s, i, c]] = acc;
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// A bivariate normal distribution in displacement space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BivariateGaussian {
    /// Mean `(μx, μy)`.
    pub mean: [f64; 2],
    /// Standard deviation along x.
    pub sx: f64,
    /// Standard deviation along y.
    pub sy: f64,
    /// Correlation coefficient in `(-1, 1)`.
    pub rho: f64,
}

impl BivariateGaussian {
    /// Decode raw model outputs `(μx, μy, log σx, log σy, atanh ρ)`.
    pub fn from_raw(raw: [f32; 5]) -> Self {
        BivariateGaussian {
            mean: [raw[0] as f64, raw[1] as f64],
            sx: (raw[2] as f64).exp(),
            sy: (raw[3] as f64).exp(),
            rho: (raw[4] as f64).tanh(),
        }
    }

    /// Draw one point using the Cholesky factor of the covariance.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; 2] {
        let z1: f64 = StandardNormal.sample(rng);
        let z2: f64 = StandardNormal.sample(rng);
        let tail = (1.0 - self.rho * self.rho).max(0.0).sqrt();
        [
            self.mean[0] + self.sx * z1,
            self.mean[1] + self.sy * (self.rho * z1 + tail * z2),
        ]
    }
}

/// Draw one displacement per node and step from `params [T, N, ≥5]`.
///
/// Returns `[T, N, 2]`.
pub fn sample_displacements<R: Rng + ?Sized>(params: ArrayView3<'_, f32>, rng: &mut R) -> Array3<f64> {
    let (steps, agents, _) = params.dim();
    let mut out = Array3::zeros((steps, agents, 2));
    for s in 0..steps {
        for i in 0..agents {
            let raw = [
                params[[s, i, 0]],
                params[[s, i, 1]],
                params[[s, i, 2]],
                params[[s, i, 3]],
                params[[s, i, 4]],
            ];
            let [x, y] = BivariateGaussian::from_raw(raw).sample(rng);
            out[[s, i, 0]] = x;
            out[[s, i, 1]] = y;
        }
    }
    out
}

/// `(min, mean)` of one agent's K sample errors; `None` for an empty slice.
pub fn best_and_mean_of_k(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let best = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((best, mean))
}

// ---------------------------------------------------------------------------
// EvalMetrics
// ---------------------------------------------------------------------------

/// Aggregated displacement metrics of one evaluation run.
///
/// All values are in raw coordinate units, averaged over every agent of the
/// evaluation set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalMetrics {
    /// Best-of-K ADE.
    pub ade: f64,
    /// Best-of-K FDE.
    pub fde: f64,
    /// Mean-of-K ADE.
    pub mean_ade: f64,
    /// Mean-of-K FDE.
    pub mean_fde: f64,
    /// Agents scored.
    pub num_agents: usize,
    /// Samples drawn per agent.
    pub num_samples: usize,
}

impl EvalMetrics {
    /// Returns `true` when this result has a strictly lower best-of-K ADE.
    pub fn is_better_than(&self, other: &EvalMetrics) -> bool {
        self.ade < other.ade
    }

    /// A human-readable summary line suitable for logging.
    pub fn summary(&self) -> String {
        format!(
            "ADE={:.4}  FDE={:.4}  mean-ADE={:.4}  mean-FDE={:.4}  (agents={}  K={})",
            self.ade, self.fde, self.mean_ade, self.mean_fde, self.num_agents, self.num_samples
        )
    }
}

// ---------------------------------------------------------------------------
// DisplacementAccumulator
// ---------------------------------------------------------------------------

/// Running per-agent best-of-K / mean-of-K errors across an evaluation set.
///
/// Call [`DisplacementAccumulator::push_agent`] once per agent with its K
/// sample errors, then [`DisplacementAccumulator::finalize`].
#[derive(Debug, Clone, Default)]
pub struct DisplacementAccumulator {
    best_ade_sum: f64,
    best_fde_sum: f64,
    mean_ade_sum: f64,
    mean_fde_sum: f64,
    num_agents: usize,
    num_samples: usize,
}

impl DisplacementAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one agent's per-sample ADE and FDE values.
    ///
    /// Agents with no samples are ignored.
    pub fn push_agent(&mut self, ade_samples: &[f64], fde_samples: &[f64]) {
        let (Some((best_ade, mean_ade)), Some((best_fde, mean_fde))) =
            (best_and_mean_of_k(ade_samples), best_and_mean_of_k(fde_samples))
        else {
            return;
        };
        self.best_ade_sum += best_ade;
        self.mean_ade_sum += mean_ade;
        self.best_fde_sum += best_fde;
        self.mean_fde_sum += mean_fde;
        self.num_agents += 1;
        self.num_samples = self.num_samples.max(ade_samples.len());
    }

    /// Number of agents recorded so far.
    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    /// Averages over all recorded agents; `None` if nothing was recorded.
    pub fn finalize(&self) -> Option<EvalMetrics> {
        if self.num_agents == 0 {
            return None;
        }
        let n = self.num_agents as f64;
        Some(EvalMetrics {
            ade: self.best_ade_sum / n,
            fde: self.best_fde_sum / n,
            mean_ade: self.mean_ade_sum / n,
            mean_fde: self.mean_fde_sum / n,
            num_agents: self.num_agents,
            num_samples: self.num_samples,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
