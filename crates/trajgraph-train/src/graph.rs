//! Trajectory window → spatio-temporal graph conversion.
//!
//! For every time-step `s` of a window the builder emits
//!
//! - a node feature matrix `V[s]` of shape `[N, 2]` holding each agent's
//!   relative displacement at `s`, and
//! - a weighted adjacency matrix `A[s]` of shape `[N, N]` with unit
//!   self-loops and symmetric pairwise edge weights computed from the
//!   relative displacements,
//!
//! optionally replacing `A[s]` by its symmetric normalized Laplacian.
//!
//! ```text
//!  seq [N, 2, T] ──┐
//!                  ├──► V [T, N, 2]
//!  rel [N, 2, T] ──┴──► A [T, N, N]  ──(norm_lap_matr)──► D^-1/2 (D - A) D^-1/2
//! ```

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut2, Axis};

use crate::config::{EdgeWeighting, TrajectoryConfig};
use crate::error::GraphError;

/// Node features and adjacency for one (sub-)window.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSequence {
    /// Node features, `[T, N, 2]`.
    pub nodes: Array3<f32>,
    /// Adjacency (or normalized Laplacian) per step, `[T, N, N]`.
    pub adjacency: Array3<f32>,
}

/// Converts agent sequences into [`GraphSequence`]s.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    weighting: EdgeWeighting,
    normalize: bool,
}

impl GraphBuilder {
    /// Create a builder with an explicit weighting policy.
    pub fn new(weighting: EdgeWeighting, normalize: bool) -> Self {
        GraphBuilder { weighting, normalize }
    }

    /// Builder configured from `edge_weighting` and `norm_lap_matr`.
    pub fn from_config(config: &TrajectoryConfig) -> Self {
        Self::new(config.edge_weighting, config.norm_lap_matr)
    }

    /// Build the graph sequence of one window.
    ///
    /// `seq` holds absolute positions and `rel` relative displacements, both
    /// `[N, 2, T]`. Agent `i` of the input is node `i` of every output step.
    ///
    /// # Errors
    ///
    /// [`GraphError::ShapeMismatch`] when the two inputs differ in shape or
    /// their middle axis is not 2.
    pub fn build(
        &self,
        seq: ArrayView3<'_, f32>,
        rel: ArrayView3<'_, f32>,
    ) -> Result<GraphSequence, GraphError> {
        if seq.shape() != rel.shape() || seq.len_of(Axis(1)) != 2 {
            return Err(GraphError::ShapeMismatch {
                absolute: seq.shape().to_vec(),
                relative: rel.shape().to_vec(),
            });
        }
        Ok(self.build_from_relative(rel))
    }

    /// Build from relative displacements alone (`[N, 2, T]`).
    ///
    /// Edge weights only depend on relative displacements, so callers that
    /// already guarantee a consistent absolute sequence use this directly.
    pub(crate) fn build_from_relative(&self, rel: ArrayView3<'_, f32>) -> GraphSequence {
        let (num_nodes, _, steps) = rel.dim();
        let mut nodes = Array3::<f32>::zeros((steps, num_nodes, 2));
        let mut adjacency = Array3::<f32>::zeros((steps, num_nodes, num_nodes));

        for s in 0..steps {
            let points: Vec<[f64; 2]> = (0..num_nodes)
                .map(|h| [rel[[h, 0, s]] as f64, rel[[h, 1, s]] as f64])
                .collect();

            for (h, p) in points.iter().enumerate() {
                nodes[[s, h, 0]] = p[0] as f32;
                nodes[[s, h, 1]] = p[1] as f32;
            }

            let mut a = self.weighted_adjacency(&points);
            if self.normalize {
                a = normalized_laplacian_unchecked(a.view());
            }
            assign(adjacency.index_axis_mut(Axis(0), s), &a);
        }

        GraphSequence { nodes, adjacency }
    }

    /// Unit diagonal plus one weight per upper-triangular pair, mirrored.
    fn weighted_adjacency(&self, points: &[[f64; 2]]) -> Array2<f64> {
        let n = points.len();
        let mut a = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            a[[i, i]] = 1.0;
        }
        for (i, j) in upper_pairs(n) {
            let w = self.weighting.weight(points[i], points[j]);
            a[[i, j]] = w;
            a[[j, i]] = w;
        }
        a
    }
}

/// All `(i, j)` with `i < j < n`.
fn upper_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
}

fn assign(mut dst: ArrayViewMut2<'_, f32>, src: &Array2<f64>) {
    dst.zip_mut_with(src, |d, &s| *d = s as f32);
}

/// Symmetric normalized Laplacian `D^-1/2 (D - A) D^-1/2`.
///
/// `D` is the diagonal of row sums of `A`, so a self-loop contributes to its
/// node's degree. A node of degree zero gets a zero inverse square root,
/// which leaves its row and column all-zero.
///
/// # Errors
///
/// [`GraphError::NotSquare`] for a non-square input.
pub fn normalized_laplacian(a: ArrayView2<'_, f64>) -> Result<Array2<f64>, GraphError> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(GraphError::NotSquare { rows, cols });
    }
    Ok(normalized_laplacian_unchecked(a))
}

fn normalized_laplacian_unchecked(a: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = a.nrows();
    let degree = a.sum_axis(Axis(1));
    let inv_sqrt: Vec<f64> = degree
        .iter()
        .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
        .collect();

    Array2::from_shape_fn((n, n), |(i, j)| {
        let l = if i == j { degree[i] - a[[i, j]] } else { -a[[i, j]] };
        inv_sqrt[i] * l * inv_sqrt[j]
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
