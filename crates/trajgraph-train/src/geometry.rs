//! Geometry and encoding helpers shared by the graph builder, the dataset
//! and the evaluator.
//!
//! Tracks are stored as `[2, T]` arrays: row 0 is x, row 1 is y, one column
//! per time-step.

use ndarray::{Array2, ArrayView2, Axis};

use crate::config::EdgeWeighting;
use crate::error::GeometryError;

/// Euclidean distance between two 2-D points.
#[inline]
pub fn euclidean(p1: [f64; 2], p2: [f64; 2]) -> f64 {
    let dx = p1[0] - p2[0];
    let dy = p1[1] - p2[1];
    (dx * dx + dy * dy).sqrt()
}

/// `1 / distance`, or exactly `0.0` when the two points coincide.
///
/// Coincident agents therefore end up disconnected in the graph.
#[inline]
pub fn inverse_distance_weight(p1: [f64; 2], p2: [f64; 2]) -> f64 {
    let d = euclidean(p1, p2);
    if d == 0.0 {
        0.0
    } else {
        1.0 / d
    }
}

/// `exp(-distance)`; always finite, 1.0 for coincident points.
#[inline]
pub fn exponential_distance_weight(p1: [f64; 2], p2: [f64; 2]) -> f64 {
    (-euclidean(p1, p2)).exp()
}

impl EdgeWeighting {
    /// Edge weight between two node positions under this policy.
    #[inline]
    pub fn weight(&self, p1: [f64; 2], p2: [f64; 2]) -> f64 {
        match self {
            EdgeWeighting::InverseDistance => inverse_distance_weight(p1, p2),
            EdgeWeighting::Exponential => exponential_distance_weight(p1, p2),
        }
    }
}

/// Convert an absolute `[2, T]` track into per-step displacements.
///
/// Column 0 becomes the zero vector; column `t > 0` becomes
/// `track[:, t] - track[:, t - 1]`.
pub fn relativize(track: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut rel = Array2::zeros(track.raw_dim());
    let steps = track.len_of(Axis(1));
    for t in 1..steps {
        for c in 0..track.len_of(Axis(0)) {
            rel[[c, t]] = track[[c, t]] - track[[c, t - 1]];
        }
    }
    rel
}

/// Inverse of [`relativize`]: `origin + Σ_{0..=t} rel[:, k]` for every `t`.
///
/// With `origin` set to the first absolute position, this reconstructs the
/// track that was relativized.
pub fn absolutize(rel: ArrayView2<'_, f64>, origin: [f64; 2]) -> Array2<f64> {
    let mut out = Array2::zeros(rel.raw_dim());
    let steps = rel.len_of(Axis(1));
    for c in 0..rel.len_of(Axis(0)).min(2) {
        let mut acc = origin[c];
        for t in 0..steps {
            acc += rel[[c, t]];
            out[[c, t]] = acc;
        }
    }
    out
}

/// Round to `decimals` places, ties to even.
#[inline]
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Classify a track as linear (`0.0`) or non-linear (`1.0`).
///
/// A quadratic is fitted by least squares to the last `window_len` points of
/// x and of y independently (abscissa `0..window_len`). When the summed
/// residual sums-of-squares reach `threshold` the track is non-linear.
/// A three-point fit is exact and always yields `0.0`.
///
/// # Errors
///
/// [`GeometryError::TooFewPoints`] when `window_len < 3` and
/// [`GeometryError::WindowTooLong`] when the track is shorter than the window.
pub fn non_linearity_flag(
    track: ArrayView2<'_, f64>,
    window_len: usize,
    threshold: f64,
) -> Result<f32, GeometryError> {
    if window_len < 3 {
        return Err(GeometryError::TooFewPoints { got: window_len });
    }
    let len = track.len_of(Axis(1));
    if window_len > len {
        return Err(GeometryError::WindowTooLong { window: window_len, len });
    }
    let start = len - window_len;
    let xs: Vec<f64> = (start..len).map(|t| track[[0, t]]).collect();
    let ys: Vec<f64> = (start..len).map(|t| track[[1, t]]).collect();
    // An exact fit has no residual to compare, so it is never non-linear.
    let residual = match (quadratic_residual(&xs), quadratic_residual(&ys)) {
        (Some(rx), Some(ry)) => rx + ry,
        _ => return Ok(0.0),
    };
    Ok(if residual >= threshold { 1.0 } else { 0.0 })
}

/// Residual sum of squares of the least-squares quadratic through
/// `(i, values[i])`, or `None` when three or fewer points fit exactly.
fn quadratic_residual(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n <= 3 {
        return None;
    }
    // Centre and scale the abscissa to keep the normal equations well
    // conditioned; the residual is invariant to this reparameterisation.
    let mid = (n - 1) as f64 / 2.0;
    let half = mid.max(1.0);
    let mut m = [[0.0f64; 3]; 3];
    let mut b = [0.0f64; 3];
    for (i, &y) in values.iter().enumerate() {
        let u = (i as f64 - mid) / half;
        let phi = [1.0, u, u * u];
        for r in 0..3 {
            b[r] += phi[r] * y;
            for c in 0..3 {
                m[r][c] += phi[r] * phi[c];
            }
        }
    }
    let coef = solve3(m, b);
    let rss = values
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let u = (i as f64 - mid) / half;
            let fit = coef[0] + coef[1] * u + coef[2] * u * u;
            (y - fit) * (y - fit)
        })
        .sum();
    Some(rss)
}

/// Gaussian elimination with partial pivoting on a 3x3 system.
///
/// The normal matrix of four or more distinct abscissae is positive definite,
/// so pivots never vanish for the inputs this module produces.
fn solve3(mut m: [[f64; 3]; 3], mut b: [f64; 3]) -> [f64; 3] {
    for col in 0..3 {
        let pivot = (col..3)
            .max_by(|&a, &c| m[a][col].abs().total_cmp(&m[c][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot);
        b.swap(col, pivot);
        let p = m[col][col];
        if p == 0.0 {
            continue;
        }
        for row in (col + 1)..3 {
            let f = m[row][col] / p;
            for k in col..3 {
                m[row][k] -= f * m[col][k];
            }
            b[row] -= f * b[col];
        }
    }
    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let mut acc = b[row];
        for k in (row + 1)..3 {
            acc -= m[row][k] * x[k];
        }
        x[row] = if m[row][row] == 0.0 { 0.0 } else { acc / m[row][row] };
    }
    x
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
