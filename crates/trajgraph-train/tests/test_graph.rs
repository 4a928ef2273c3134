//! Integration tests for [`trajgraph_train::graph`].

use approx::assert_abs_diff_eq;
use ndarray::{array, Array3, Axis};
use proptest::prelude::*;
use trajgraph_train::config::{EdgeWeighting, TrajectoryConfig};
use trajgraph_train::error::GraphError;
use trajgraph_train::graph::{normalized_laplacian, GraphBuilder};

/// `[N, 2, T]` displacements from a closure over `(agent, coord, step)`.
fn rel_window(agents: usize, steps: usize, f: impl Fn(usize, usize, usize) -> f32) -> Array3<f32> {
    Array3::from_shape_fn((agents, 2, steps), |(n, c, t)| f(n, c, t))
}

#[test]
fn builder_from_default_config_normalizes() {
    let cfg = TrajectoryConfig::default();
    let rel = rel_window(2, 1, |n, c, _| if c == 0 { n as f32 } else { 0.0 });
    let g = GraphBuilder::from_config(&cfg).build(rel.view(), rel.view()).unwrap();
    // Two nodes at distance 1: A = [[1, 1], [1, 1]], degree 2 each.
    assert_abs_diff_eq!(g.adjacency[[0, 0, 0]], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(g.adjacency[[0, 0, 1]], -0.5, epsilon = 1e-6);
}

#[test]
fn single_agent_graph() {
    let rel = rel_window(1, 3, |_, c, t| (c + t) as f32);
    let raw = GraphBuilder::new(EdgeWeighting::InverseDistance, false)
        .build(rel.view(), rel.view())
        .unwrap();
    assert_eq!(raw.adjacency.shape(), &[3, 1, 1]);
    assert!(raw.adjacency.iter().all(|&v| v == 1.0));

    let norm = GraphBuilder::new(EdgeWeighting::InverseDistance, true)
        .build(rel.view(), rel.view())
        .unwrap();
    // D - A is zero for a lone self-loop.
    assert!(norm.adjacency.iter().all(|&v| v == 0.0));
}

#[test]
fn node_features_are_transposed_displacements() {
    let rel = rel_window(3, 4, |n, c, t| (100 * n + 10 * c + t) as f32);
    let g = GraphBuilder::new(EdgeWeighting::InverseDistance, true)
        .build(rel.view(), rel.view())
        .unwrap();
    for t in 0..4 {
        for n in 0..3 {
            assert_eq!(g.nodes[[t, n, 0]], rel[[n, 0, t]]);
            assert_eq!(g.nodes[[t, n, 1]], rel[[n, 1, t]]);
        }
    }
}

#[test]
fn middle_axis_must_be_two() {
    let bad = Array3::<f32>::zeros((2, 3, 4));
    let err = GraphBuilder::new(EdgeWeighting::InverseDistance, true)
        .build(bad.view(), bad.view())
        .unwrap_err();
    assert!(matches!(err, GraphError::ShapeMismatch { .. }));
}

#[test]
fn laplacian_of_path_graph() {
    // 0 - 1 - 2 with unit weights and self-loops.
    let a = array![[1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]];
    let l = normalized_laplacian(a.view()).unwrap();
    assert_abs_diff_eq!(l[[0, 0]], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(l[[1, 1]], 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(l[[0, 1]], -1.0 / 6.0f64.sqrt(), epsilon = 1e-12);
    assert_eq!(l[[0, 2]], 0.0);
}

proptest! {
    #[test]
    fn prop_adjacency_is_symmetric(
        coords in prop::collection::vec(-20.0f32..20.0, 2 * 4 * 3),
        normalize in any::<bool>(),
    ) {
        let rel = Array3::from_shape_vec((4, 2, 3), coords).unwrap();
        let g = GraphBuilder::new(EdgeWeighting::InverseDistance, normalize)
            .build(rel.view(), rel.view())
            .unwrap();
        for a in g.adjacency.axis_iter(Axis(0)) {
            for i in 0..4 {
                for j in 0..4 {
                    prop_assert!((a[[i, j]] - a[[j, i]]).abs() <= 1e-5 * (1.0 + a[[i, j]].abs()));
                }
            }
        }
        prop_assert!(g.adjacency.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn prop_raw_diagonal_is_one(coords in prop::collection::vec(-5.0f32..5.0, 2 * 3 * 2)) {
        let rel = Array3::from_shape_vec((3, 2, 2), coords).unwrap();
        let g = GraphBuilder::new(EdgeWeighting::Exponential, false)
            .build(rel.view(), rel.view())
            .unwrap();
        for a in g.adjacency.axis_iter(Axis(0)) {
            for i in 0..3 {
                prop_assert_eq!(a[[i, i]], 1.0);
            }
        }
    }
}
