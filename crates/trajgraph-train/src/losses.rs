//! Loss functions for trajectory graph models.
//!
//! Two per-window losses are provided, selected by [`LossKind`]:
//!
//! - **Bivariate Gaussian NLL**: the model predicts, per node and future
//!   step, `(μx, μy, log σx, log σy, atanh ρ)`; the loss is the mean negative
//!   log-density of the ground-truth displacement.
//! - **Direct norm**: the model predicts the target features directly
//!   (3-D skeleton outputs); the loss is the mean Euclidean norm of the
//!   residual.
//!
//! Either raw loss is multiplied by the class-mix factor of the window:
//!
//! ```text
//! L_total = L_raw · Σ_c count_c · w_c / Σ_c count_c
//! ```
//!
//! where `count_c` is the number of nodes of class `c` and `w_c` its
//! inverse-frequency weight.
//!
//! The functions in this module work on `ndarray` views and return detached
//! `f64` values, which is what validation and evaluation need. With the
//! `tch-backend` feature the [`tensor`] submodule provides the same
//! bivariate loss as a differentiable [`tch::Tensor`] expression.

use ndarray::{ArrayView2, ArrayView3, Axis};
use std::f64::consts::PI;

use crate::classes::{class_counts, ClassRegistry, ClassWeightTable};
use crate::config::{LossKind, TrajectoryConfig};
use crate::error::{ConfigError, LossError};

/// Lower clamp applied to densities before taking the logarithm.
pub const DENSITY_FLOOR: f64 = 1e-20;

/// Number of distribution parameters per node and step.
pub const BIVARIATE_PARAMS: usize = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Component losses
// ─────────────────────────────────────────────────────────────────────────────

/// Density of `(dx, dy)` under a zero-mean bivariate normal with standard
/// deviations `sx`, `sy` and correlation `rho`.
#[inline]
pub fn bivariate_density(dx: f64, dy: f64, sx: f64, sy: f64, rho: f64) -> f64 {
    let z = (dx / sx).powi(2) + (dy / sy).powi(2) - 2.0 * rho * dx * dy / (sx * sy);
    let neg_rho = 1.0 - rho * rho;
    (-z / (2.0 * neg_rho)).exp() / (2.0 * PI * sx * sy * neg_rho.sqrt())
}

/// Mean negative log-likelihood of `target` under the bivariate Gaussians
/// parameterised by `pred`.
///
/// # Shapes
/// - `pred`: `[T, N, P]` with `P >= 5`; channels 0..5 are
///   `(μx, μy, log σx, log σy, atanh ρ)`, further channels are ignored.
/// - `target`: `[T, N, 2]`.
///
/// Densities are clamped at [`DENSITY_FLOOR`], so a single step contributes
/// at most `-ln(1e-20) ≈ 46.05`.
///
/// # Errors
///
/// [`LossError::ShapeMismatch`] for incompatible shapes and
/// [`LossError::EmptyBatch`] when `T · N == 0`.
pub fn bivariate_nll(
    pred: ArrayView3<'_, f32>,
    target: ArrayView3<'_, f32>,
) -> Result<f64, LossError> {
    let (t, n, p) = pred.dim();
    if (t, n) != (target.dim().0, target.dim().1) || p < BIVARIATE_PARAMS || target.dim().2 != 2 {
        return Err(LossError::ShapeMismatch {
            prediction: pred.shape().to_vec(),
            target: target.shape().to_vec(),
        });
    }
    if t * n == 0 {
        return Err(LossError::EmptyBatch);
    }

    let mut sum = 0.0f64;
    for s in 0..t {
        for i in 0..n {
            let dx = (target[[s, i, 0]] - pred[[s, i, 0]]) as f64;
            let dy = (target[[s, i, 1]] - pred[[s, i, 1]]) as f64;
            let sx = (pred[[s, i, 2]] as f64).exp();
            let sy = (pred[[s, i, 3]] as f64).exp();
            let rho = (pred[[s, i, 4]] as f64).tanh();
            let density = bivariate_density(dx, dy, sx, sy, rho);
            sum -= density.max(DENSITY_FLOOR).ln();
        }
    }
    Ok(sum / (t * n) as f64)
}

/// Mean Euclidean norm of `target - pred` over the feature axis.
///
/// Both inputs are `[T, N, F]` and must match exactly.
///
/// # Errors
///
/// [`LossError::ShapeMismatch`] for different shapes and
/// [`LossError::EmptyBatch`] when `T · N == 0`.
pub fn direct_norm_loss(
    pred: ArrayView3<'_, f32>,
    target: ArrayView3<'_, f32>,
) -> Result<f64, LossError> {
    if pred.shape() != target.shape() {
        return Err(LossError::ShapeMismatch {
            prediction: pred.shape().to_vec(),
            target: target.shape().to_vec(),
        });
    }
    let (t, n, _) = pred.dim();
    if t * n == 0 {
        return Err(LossError::EmptyBatch);
    }
    let residual = &target - &pred;
    let norms = residual.map_axis(Axis(2), |v| v.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt());
    Ok(norms.sum() / (t * n) as f64)
}

/// `Σ count_c · w_c / Σ count_c`.
///
/// # Errors
///
/// [`LossError::WeightCountMismatch`] when fewer weights than classes are
/// supplied and [`LossError::EmptyBatch`] when all counts are zero.
pub fn class_reweighting_multiplier(counts: &[usize], weights: &[f64]) -> Result<f64, LossError> {
    if weights.len() < counts.len() {
        return Err(LossError::WeightCountMismatch {
            expected: counts.len(),
            actual: weights.len(),
        });
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return Err(LossError::EmptyBatch);
    }
    let weighted: f64 = counts.iter().zip(weights).map(|(&c, &w)| c as f64 * w).sum();
    Ok(weighted / total as f64)
}

// ─────────────────────────────────────────────────────────────────────────────
// GraphLoss
// ─────────────────────────────────────────────────────────────────────────────

/// Scalar components of one [`GraphLoss::compute`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBreakdown {
    /// Loss before class reweighting.
    pub raw: f64,
    /// Class-mix multiplier of the window.
    pub multiplier: f64,
    /// `raw · multiplier`.
    pub total: f64,
}

/// Loss variant plus class reweighting, fixed for one run.
#[derive(Debug, Clone)]
pub struct GraphLoss {
    kind: LossKind,
    registry: ClassRegistry,
    weights: Vec<f64>,
}

impl GraphLoss {
    /// Combine a loss variant with per-class weights ordered like `registry`.
    ///
    /// # Errors
    ///
    /// [`LossError::WeightCountMismatch`] if `weights` does not have one entry
    /// per class.
    pub fn new(kind: LossKind, registry: ClassRegistry, weights: Vec<f64>) -> Result<Self, LossError> {
        if weights.len() != registry.len() {
            return Err(LossError::WeightCountMismatch {
                expected: registry.len(),
                actual: weights.len(),
            });
        }
        Ok(GraphLoss { kind, registry, weights })
    }

    /// Build from the run configuration and a class weight table.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingClassWeight`] when the table lacks a configured
    /// label.
    pub fn from_config(config: &TrajectoryConfig, table: &ClassWeightTable) -> Result<Self, ConfigError> {
        let registry = ClassRegistry::from_config(config);
        let weights = table.weights_for(&registry)?;
        Ok(GraphLoss { kind: config.loss_kind, registry, weights })
    }

    /// Uniform class weights; the multiplier is always 1.
    pub fn unweighted(kind: LossKind, registry: ClassRegistry) -> Self {
        let weights = vec![1.0; registry.len()];
        GraphLoss { kind, registry, weights }
    }

    /// Active loss variant.
    pub fn kind(&self) -> LossKind {
        self.kind
    }

    /// Loss of one window.
    ///
    /// - `pred`: `[T_pred, N, P]` model output.
    /// - `target`: `[T_pred, N, F]` ground-truth node features.
    /// - `classes`: `[N, C]` one-hot rows of the same nodes.
    pub fn compute(
        &self,
        pred: ArrayView3<'_, f32>,
        target: ArrayView3<'_, f32>,
        classes: ArrayView2<'_, f32>,
    ) -> Result<LossBreakdown, LossError> {
        let raw = match self.kind {
            LossKind::Bivariate => bivariate_nll(pred, target)?,
            LossKind::DirectNorm => direct_norm_loss(pred, target)?,
        };
        let counts = class_counts(&self.registry, classes)?;
        let multiplier = class_reweighting_multiplier(&counts, &self.weights)?;
        Ok(LossBreakdown { raw, multiplier, total: raw * multiplier })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Differentiable variant
// ─────────────────────────────────────────────────────────────────────────────

/// `tch` implementation of the bivariate loss for use inside a libtorch
/// training loop.
#[cfg(feature = "tch-backend")]
pub mod tensor {
    use tch::{Kind, Tensor};

    use super::DENSITY_FLOOR;

    /// Mean bivariate NLL of `target [T, N, 2]` under `pred [T, N, ≥5]`.
    ///
    /// Returns a scalar tensor attached to the autograd graph of `pred`.
    pub fn bivariate_nll(pred: &Tensor, target: &Tensor) -> Tensor {
        let normx = target.select(2, 0) - pred.select(2, 0);
        let normy = target.select(2, 1) - pred.select(2, 1);
        let sx = pred.select(2, 2).exp();
        let sy = pred.select(2, 3).exp();
        let corr = pred.select(2, 4).tanh();

        let sxsy = &sx * &sy;
        let z = (&normx / &sx).square() + (&normy / &sy).square()
            - (&corr * &normx * &normy / &sxsy) * 2.0;
        let neg_rho = corr.square().neg() + 1.0;

        let numerator = (z.neg() / (&neg_rho * 2.0)).exp();
        let denom = sxsy * neg_rho.sqrt() * (2.0 * std::f64::consts::PI);
        let density = numerator / denom;

        density.clamp_min(DENSITY_FLOOR).log().neg().mean(Kind::Float)
    }

    /// `bivariate_nll(pred, target) · multiplier`.
    pub fn weighted_bivariate_nll(pred: &Tensor, target: &Tensor, multiplier: f64) -> Tensor {
        bivariate_nll(pred, target) * multiplier
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use ndarray::Array3;

        #[test]
        fn matches_ndarray_loss() {
            let pred = Array3::from_shape_fn((3, 2, 5), |(t, n, c)| 0.1 * (t + n + c) as f32 - 0.2);
            let target = Array3::from_shape_fn((3, 2, 2), |(t, n, c)| 0.3 * (t * 2 + n + c) as f32);
            let expected = super::super::bivariate_nll(pred.view(), target.view()).unwrap();

            let p = Tensor::from_slice(pred.as_slice().unwrap()).reshape([3, 2, 5]);
            let g = Tensor::from_slice(target.as_slice().unwrap()).reshape([3, 2, 2]);
            let got = bivariate_nll(&p, &g).double_value(&[]);
            assert!((got - expected).abs() < 1e-4, "{got} vs {expected}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
