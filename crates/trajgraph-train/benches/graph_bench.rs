//! Benchmarks for graph construction, losses and sampling.
//!
//! All benchmark inputs are constructed from fixed, deterministic data, and
//! the sampler uses a seeded generator, so numbers are reproducible.
//!
//! Run with:
//!
//! ```bash
//! cargo bench -p trajgraph-train
//! ```
//!
//! Criterion HTML reports are written to `target/criterion/`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use trajgraph_train::{
    config::{EdgeWeighting, TrajectoryConfig},
    graph::{normalized_laplacian, GraphBuilder},
    losses::bivariate_nll,
    metrics::sample_displacements,
};

/// `[N, 2, T]` displacements on a slowly rotating grid.
fn rel_window(agents: usize, steps: usize) -> Array3<f32> {
    Array3::from_shape_fn((agents, 2, steps), |(n, c, t)| {
        let phase = (n * 7 + t) as f32 * 0.1;
        if c == 0 {
            phase.cos() * (1.0 + n as f32 * 0.05)
        } else {
            phase.sin() * (1.0 + n as f32 * 0.05)
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Graph construction
// ─────────────────────────────────────────────────────────────────────────────

/// Graph sequence construction for growing scene sizes (O(T · N²)).
fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    let builder = GraphBuilder::from_config(&TrajectoryConfig::default());

    for agents in [4_usize, 16, 64] {
        let rel = rel_window(agents, 20);
        group.bench_with_input(BenchmarkId::new("agents", agents), &agents, |b, _| {
            b.iter(|| {
                let _ = builder.build(black_box(rel.view()), black_box(rel.view()));
            });
        });
    }

    group.finish();
}

/// Raw adjacency without the Laplacian, to isolate normalization cost.
fn bench_graph_build_raw(c: &mut Criterion) {
    let builder = GraphBuilder::new(EdgeWeighting::InverseDistance, false);
    let rel = rel_window(32, 20);
    c.bench_function("graph_build_raw_32", |b| {
        b.iter(|| {
            let _ = builder.build(black_box(rel.view()), black_box(rel.view()));
        });
    });
}

fn bench_laplacian(c: &mut Criterion) {
    let a = Array2::<f64>::from_shape_fn((64, 64), |(i, j)| {
        if i == j {
            1.0
        } else {
            1.0 / (1.0 + (i as f64 - j as f64).abs())
        }
    });
    c.bench_function("normalized_laplacian_64", |b| {
        b.iter(|| {
            let _ = normalized_laplacian(black_box(a.view()));
        });
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Loss and sampling
// ─────────────────────────────────────────────────────────────────────────────

fn bench_bivariate_nll(c: &mut Criterion) {
    let pred = Array3::<f32>::from_shape_fn((12, 32, 5), |(t, n, p)| ((t + n + p) as f32 * 0.01).sin());
    let target = Array3::<f32>::from_shape_fn((12, 32, 2), |(t, n, p)| ((t * n + p) as f32 * 0.02).cos());
    c.bench_function("bivariate_nll_12x32", |b| {
        b.iter(|| {
            let _ = bivariate_nll(black_box(pred.view()), black_box(target.view()));
        });
    });
}

/// One evaluation sample for a 32-agent window.
fn bench_sample_displacements(c: &mut Criterion) {
    let params = Array3::<f32>::from_shape_fn((12, 32, 5), |(_, _, p)| if p >= 2 { -1.0 } else { 0.3 });
    let mut rng = StdRng::seed_from_u64(42);
    c.bench_function("sample_displacements_12x32", |b| {
        b.iter(|| {
            let _ = sample_displacements(black_box(params.view()), &mut rng);
        });
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Criterion registration
// ─────────────────────────────────────────────────────────────────────────────

criterion_group!(
    benches,
    // Graph
    bench_graph_build,
    bench_graph_build_raw,
    bench_laplacian,
    // Loss / sampling
    bench_bivariate_nll,
    bench_sample_displacements,
);
criterion_main!(benches);
