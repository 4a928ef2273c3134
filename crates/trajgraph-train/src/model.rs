//! The model boundary and the models shipped with this crate.
//!
//! ```text
//!  v_obs   [1, 2, T_obs, N]  ──┐
//!  a_obs   [T_obs, N, N]     ──┼──► TrajectoryModel::forward ──► [T_pred, N, P]
//!  classes [N, C]            ──┘
//! ```
//!
//! For bivariate outputs `P = 5` and the channels are
//! `(μx, μy, log σx, log σy, atanh ρ)` of the next displacement. For direct
//! outputs `P` equals the node feature width.
//!
//! The graph network itself is trained elsewhere; this crate only consumes
//! it. [`ConstantVelocityModel`] is a deterministic baseline that extrapolates
//! each agent's last observed displacement. With the `tch-backend` feature,
//! `TorchScriptModel` runs a traced network exported from a libtorch training
//! loop.

use ndarray::{Array3, ArrayView2, ArrayView3, ArrayView4, Axis};

use crate::config::LossKind;
use crate::error::{TrainError, TrainResult};
use crate::losses::BIVARIATE_PARAMS;

// ---------------------------------------------------------------------------
// TrajectoryModel
// ---------------------------------------------------------------------------

/// A model predicting future node features from observed graphs.
///
/// Implementations must be `Send + Sync` so one instance can serve several
/// evaluation threads.
pub trait TrajectoryModel: Send + Sync {
    /// Predict `[T_pred, N, P]` from one window's observed graphs.
    ///
    /// # Errors
    ///
    /// Implementations return [`TrainError::Model`] when inference fails.
    fn forward(
        &self,
        v_obs: ArrayView4<'_, f32>,
        a_obs: ArrayView3<'_, f32>,
        classes: ArrayView2<'_, f32>,
    ) -> TrainResult<Array3<f32>>;

    /// Number of output channels `P`.
    fn output_dim(&self) -> usize;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// ConstantVelocityModel
// ---------------------------------------------------------------------------

/// Repeats each agent's last observed displacement for every future step.
///
/// For bivariate output the spread is a fixed isotropic `sigma` with zero
/// correlation.
#[derive(Debug, Clone)]
pub struct ConstantVelocityModel {
    pred_len: usize,
    kind: LossKind,
    log_sigma: f32,
}

impl ConstantVelocityModel {
    /// Bivariate baseline with the given standard deviation (must be > 0).
    pub fn bivariate(pred_len: usize, sigma: f32) -> Self {
        ConstantVelocityModel { pred_len, kind: LossKind::Bivariate, log_sigma: sigma.ln() }
    }

    /// Baseline emitting the displacement itself (two channels).
    pub fn direct(pred_len: usize) -> Self {
        ConstantVelocityModel { pred_len, kind: LossKind::DirectNorm, log_sigma: 0.0 }
    }
}

impl TrajectoryModel for ConstantVelocityModel {
    fn forward(
        &self,
        v_obs: ArrayView4<'_, f32>,
        _a_obs: ArrayView3<'_, f32>,
        _classes: ArrayView2<'_, f32>,
    ) -> TrainResult<Array3<f32>> {
        let (batch, dims, steps, agents) = v_obs.dim();
        if batch != 1 || dims != 2 {
            return Err(TrainError::shape_mismatch(
                vec![1, 2, steps, agents],
                v_obs.shape().to_vec(),
            ));
        }
        let frame = v_obs.index_axis(Axis(0), 0);
        let mut out = Array3::zeros((self.pred_len, agents, self.output_dim()));
        for i in 0..agents {
            let (vx, vy) = match steps {
                0 => (0.0, 0.0),
                _ => (frame[[0, steps - 1, i]], frame[[1, steps - 1, i]]),
            };
            for s in 0..self.pred_len {
                out[[s, i, 0]] = vx;
                out[[s, i, 1]] = vy;
                if self.kind == LossKind::Bivariate {
                    out[[s, i, 2]] = self.log_sigma;
                    out[[s, i, 3]] = self.log_sigma;
                }
            }
        }
        Ok(out)
    }

    fn output_dim(&self) -> usize {
        match self.kind {
            LossKind::Bivariate => BIVARIATE_PARAMS,
            LossKind::DirectNorm => 2,
        }
    }

    fn name(&self) -> &str {
        "ConstantVelocityModel"
    }
}

// ---------------------------------------------------------------------------
// TorchScriptModel
// ---------------------------------------------------------------------------

#[cfg(feature = "tch-backend")]
pub use torchscript::TorchScriptModel;

#[cfg(feature = "tch-backend")]
mod torchscript {
    use ndarray::{Array3, ArrayView2, ArrayView3, ArrayView4};
    use std::path::Path;
    use std::sync::Mutex;
    use tch::{CModule, IValue, Tensor};

    use super::TrajectoryModel;
    use crate::error::{TrainError, TrainResult};

    /// A traced graph network loaded from a TorchScript file.
    ///
    /// The module is called as `module(v_obs, a_obs, classes)` and must return
    /// `[1, P, T_pred, N]`, optionally as the first element of a tuple.
    pub struct TorchScriptModel {
        module: Mutex<CModule>,
        output_dim: usize,
        name: String,
    }

    impl TorchScriptModel {
        /// Load a TorchScript module from `path`.
        pub fn load(path: &Path, output_dim: usize) -> TrainResult<Self> {
            let module = CModule::load(path)
                .map_err(|e| TrainError::model(format!("cannot load {}: {e}", path.display())))?;
            Ok(TorchScriptModel {
                module: Mutex::new(module),
                output_dim,
                name: path.display().to_string(),
            })
        }
    }

    fn to_tensor<'a, D: ndarray::Dimension>(view: ndarray::ArrayView<'a, f32, D>) -> Tensor {
        let shape: Vec<i64> = view.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = view.iter().copied().collect();
        Tensor::from_slice(&data).reshape(shape.as_slice())
    }

    impl TrajectoryModel for TorchScriptModel {
        fn forward(
            &self,
            v_obs: ArrayView4<'_, f32>,
            a_obs: ArrayView3<'_, f32>,
            classes: ArrayView2<'_, f32>,
        ) -> TrainResult<Array3<f32>> {
            let inputs = [
                IValue::Tensor(to_tensor(v_obs)),
                IValue::Tensor(to_tensor(a_obs)),
                IValue::Tensor(to_tensor(classes)),
            ];
            let module = self
                .module
                .lock()
                .map_err(|_| TrainError::model("TorchScript module lock poisoned"))?;
            let output = tch::no_grad(|| module.forward_is(&inputs))
                .map_err(|e| TrainError::model(format!("forward failed: {e}")))?;
            drop(module);

            let tensor = match output {
                IValue::Tensor(t) => t,
                IValue::Tuple(mut items) if !items.is_empty() => match items.swap_remove(0) {
                    IValue::Tensor(t) => t,
                    _ => return Err(TrainError::model("first tuple element is not a tensor")),
                },
                _ => return Err(TrainError::model("module returned neither a tensor nor a tuple")),
            };

            let size = tensor.size();
            if size.len() != 4 || size[0] != 1 {
                return Err(TrainError::shape_mismatch(
                    vec![1, self.output_dim, 0, 0],
                    size.iter().map(|&d| d as usize).collect(),
                ));
            }
            let (steps, agents, channels) = (size[2] as usize, size[3] as usize, size[1] as usize);
            let permuted = tensor.squeeze_dim(0).permute([1, 2, 0]).contiguous();
            let data = Vec::<f32>::try_from(&permuted.flatten(0, -1))
                .map_err(|e| TrainError::model(format!("cannot read output: {e}")))?;
            Array3::from_shape_vec((steps, agents, channels), data)
                .map_err(|e| TrainError::model(format!("output reshape failed: {e}")))
        }

        fn output_dim(&self) -> usize {
            self.output_dim
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
