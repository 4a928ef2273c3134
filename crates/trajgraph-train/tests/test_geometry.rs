//! Integration tests for [`trajgraph_train::geometry`].

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use proptest::prelude::*;
use trajgraph_train::config::EdgeWeighting;
use trajgraph_train::geometry::{
    absolutize, euclidean, non_linearity_flag, relativize, round_to_decimals,
};

// ---------------------------------------------------------------------------
// Distances and weights
// ---------------------------------------------------------------------------

#[test]
fn euclidean_of_pythagorean_triple() {
    assert_abs_diff_eq!(euclidean([0.0, 0.0], [3.0, 4.0]), 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(euclidean([1.0, 1.0], [1.0, 1.0]), 0.0, epsilon = 1e-12);
}

#[test]
fn inverse_distance_is_zero_for_coincident_points() {
    let w = EdgeWeighting::InverseDistance;
    assert_eq!(w.weight([2.0, 2.0], [2.0, 2.0]), 0.0);
    assert_abs_diff_eq!(w.weight([0.0, 0.0], [0.0, 4.0]), 0.25, epsilon = 1e-12);
}

#[test]
fn exponential_weight_decays_with_distance() {
    let w = EdgeWeighting::Exponential;
    let near = w.weight([0.0, 0.0], [0.5, 0.0]);
    let far = w.weight([0.0, 0.0], [3.0, 0.0]);
    assert!(near > far);
    assert!(far > 0.0);
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

#[test]
fn rounding_to_four_decimals_ties_to_even() {
    assert_eq!(round_to_decimals(1.23456, 4), 1.2346);
    assert_eq!(round_to_decimals(0.5, 0), 0.0);
    assert_eq!(round_to_decimals(1.5, 0), 2.0);
    assert_eq!(round_to_decimals(-3.0, 4), -3.0);
}

// ---------------------------------------------------------------------------
// Non-linearity
// ---------------------------------------------------------------------------

#[test]
fn straight_line_is_linear() {
    let track = Array2::from_shape_fn((2, 12), |(c, t)| if c == 0 { t as f64 * 0.4 } else { 1.0 });
    assert_eq!(non_linearity_flag(track.view(), 12, 0.002).unwrap(), 0.0);
}

#[test]
fn zig_zag_is_non_linear() {
    let track = Array2::from_shape_fn((2, 12), |(c, t)| {
        if c == 0 {
            t as f64
        } else if t % 2 == 0 {
            0.0
        } else {
            1.0
        }
    });
    assert_eq!(non_linearity_flag(track.view(), 12, 0.002).unwrap(), 1.0);
}

#[test]
fn fit_uses_only_the_trailing_window() {
    // Erratic start, straight tail.
    let track = Array2::from_shape_fn((2, 10), |(c, t)| match (c, t) {
        (0, t) if t < 4 => (t * t * 7 % 5) as f64,
        (0, t) => t as f64,
        _ => 0.0,
    });
    assert_eq!(non_linearity_flag(track.view(), 6, 0.002).unwrap(), 0.0);
    assert_eq!(non_linearity_flag(track.view(), 10, 0.002).unwrap(), 1.0);
}

#[test]
fn too_short_windows_are_rejected() {
    let track = Array2::<f64>::zeros((2, 5));
    assert!(non_linearity_flag(track.view(), 2, 0.002).is_err());
    assert!(non_linearity_flag(track.view(), 6, 0.002).is_err());
}

// ---------------------------------------------------------------------------
// Relativize / absolutize
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_absolutize_inverts_relativize(
        xs in prop::collection::vec(-500.0f64..500.0, 1..30),
        ys_seed in -100.0f64..100.0,
    ) {
        let steps = xs.len();
        let track = Array2::from_shape_fn((2, steps), |(c, t)| {
            if c == 0 { xs[t] } else { ys_seed + t as f64 * 0.3 }
        });
        let rel = relativize(track.view());
        prop_assert_eq!(rel[[0, 0]], 0.0);
        prop_assert_eq!(rel[[1, 0]], 0.0);

        let back = absolutize(rel.view(), [track[[0, 0]], track[[1, 0]]]);
        for t in 0..steps {
            prop_assert!((back[[0, t]] - track[[0, t]]).abs() < 1e-9);
            prop_assert!((back[[1, t]] - track[[1, t]]).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_inverse_distance_is_symmetric(
        a in (-50.0f64..50.0, -50.0f64..50.0),
        b in (-50.0f64..50.0, -50.0f64..50.0),
    ) {
        let w = EdgeWeighting::InverseDistance;
        let p = [a.0, a.1];
        let q = [b.0, b.1];
        prop_assert_eq!(w.weight(p, q), w.weight(q, p));
        prop_assert!(w.weight(p, q) >= 0.0);
    }
}
