//! Integration tests for [`trajgraph_train::metrics`].

use approx::assert_abs_diff_eq;
use ndarray::{array, Array3};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use trajgraph_train::error::MetricsError;
use trajgraph_train::metrics::{ade, fde, relative_to_absolute, sample_displacements, EvalMetrics};

fn scene(steps: usize, agents: usize, f: impl Fn(usize, usize, usize) -> f64) -> Array3<f64> {
    Array3::from_shape_fn((steps, agents, 2), |(t, n, c)| f(t, n, c))
}

// ---------------------------------------------------------------------------
// ADE / FDE
// ---------------------------------------------------------------------------

#[test]
fn scenes_are_averaged_with_equal_weight() {
    // Scene A: one agent, constant error 1. Scene B: two agents, errors 3 and 5.
    let pa = scene(2, 1, |_, _, _| 0.0);
    let ta = scene(2, 1, |_, _, c| if c == 0 { 1.0 } else { 0.0 });
    let pb = scene(2, 2, |_, _, _| 0.0);
    let tb = scene(2, 2, |_, n, c| match (n, c) {
        (0, 1) => 3.0,
        (1, 0) => 5.0,
        _ => 0.0,
    });
    let preds = [pa.view(), pb.view()];
    let targets = [ta.view(), tb.view()];
    assert_abs_diff_eq!(ade(&preds, &targets, &[1, 2]).unwrap(), (1.0 + 4.0) / 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(fde(&preds, &targets, &[1, 2]).unwrap(), (1.0 + 4.0) / 2.0, epsilon = 1e-12);
}

#[test]
fn fde_only_looks_at_the_last_step() {
    let p = scene(3, 1, |_, _, _| 0.0);
    let t = scene(3, 1, |s, _, c| if s == 2 && c == 0 { 6.0 } else { 0.0 });
    assert_abs_diff_eq!(fde(&[p.view()], &[t.view()], &[1]).unwrap(), 6.0, epsilon = 1e-12);
    assert_abs_diff_eq!(ade(&[p.view()], &[t.view()], &[1]).unwrap(), 2.0, epsilon = 1e-12);
}

#[test]
fn mismatched_inputs_are_rejected() {
    let a = scene(2, 2, |_, _, _| 0.0);
    let b = scene(3, 2, |_, _, _| 0.0);
    assert!(matches!(
        ade(&[a.view()], &[b.view()], &[2]),
        Err(MetricsError::ShapeMismatch { scene: 0, .. })
    ));
    assert!(matches!(
        fde(&[a.view()], &[a.view(), a.view()], &[2]),
        Err(MetricsError::SceneCountMismatch { .. })
    ));
}

#[test]
fn origin_must_match_agents() {
    let nodes = Array3::<f64>::zeros((2, 3, 2));
    let origin = array![[0.0, 0.0], [1.0, 1.0]];
    assert!(matches!(
        relative_to_absolute(nodes.view(), origin.view()),
        Err(MetricsError::OriginMismatch { .. })
    ));
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

#[test]
fn sampled_displacements_have_node_layout() {
    let params = Array3::from_shape_fn((12, 4, 5), |(_, n, c)| match c {
        0 => n as f32,
        1 => -(n as f32),
        _ => -3.0,
    });
    let mut rng = StdRng::seed_from_u64(3);
    let draws = sample_displacements(params.view(), &mut rng);
    assert_eq!(draws.shape(), &[12, 4, 2]);
    // σ = e^-3 ≈ 0.05: every draw stays close to its mean.
    for ((_, n, c), &v) in draws.indexed_iter() {
        let mean = if c == 0 { n as f64 } else { -(n as f64) };
        assert!((v - mean).abs() < 0.5, "draw {v} too far from {mean}");
    }
}

#[test]
fn same_seed_same_draws() {
    let params = Array3::<f32>::zeros((3, 2, 5));
    let a = sample_displacements(params.view(), &mut StdRng::seed_from_u64(11));
    let b = sample_displacements(params.view(), &mut StdRng::seed_from_u64(11));
    assert_eq!(a, b);
}

#[test]
fn metrics_summary_and_ordering() {
    let good = EvalMetrics { ade: 0.4, fde: 0.8, mean_ade: 0.9, mean_fde: 1.7, num_agents: 10, num_samples: 20 };
    let bad = EvalMetrics { ade: 0.6, ..good.clone() };
    assert!(good.is_better_than(&bad));
    assert!(!bad.is_better_than(&good));
    let line = good.summary();
    assert!(line.contains("ADE=0.4000"));
    assert!(line.contains("K=20"));
}

proptest! {
    #[test]
    fn prop_fde_bounded_by_worst_final_error(
        coords in prop::collection::vec(-10.0f64..10.0, 4 * 3 * 2),
        shift in 0.0f64..5.0,
    ) {
        let p = Array3::from_shape_vec((4, 3, 2), coords).unwrap();
        let t = p.mapv(|v| v + shift);
        let expected = (2.0 * shift * shift).sqrt();
        let a = ade(&[p.view()], &[t.view()], &[3]).unwrap();
        let f = fde(&[p.view()], &[t.view()], &[3]).unwrap();
        prop_assert!((a - expected).abs() < 1e-9);
        prop_assert!((f - expected).abs() < 1e-9);
    }

    #[test]
    fn prop_reconstruction_starts_at_origin_plus_first_step(
        ox in -50.0f64..50.0,
        oy in -50.0f64..50.0,
        dx in -2.0f64..2.0,
    ) {
        let nodes = Array3::from_shape_fn((5, 1, 2), |(_, _, c)| if c == 0 { dx } else { 0.0 });
        let abs = relative_to_absolute(nodes.view(), array![[ox, oy]].view()).unwrap();
        prop_assert!((abs[[0, 0, 0]] - (ox + dx)).abs() < 1e-9);
        prop_assert!((abs[[4, 0, 0]] - (ox + 5.0 * dx)).abs() < 1e-9);
        prop_assert!((abs[[4, 0, 1]] - oy).abs() < 1e-12);
    }
}
