//! Benchmarks for feature generation and evaluation.
//!
//! Run with:
//! ```bash
//! cargo bench --bench generate
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::DMatrix;
use npfga_rs::config::GraphConfig;
use npfga_rs::graph::FGraph;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const UNITS: [&str; 3] = ["m", "s", ""];

/// Graph over `n_roots` positive roots with mixed units and two layers.
fn build_graph(n_roots: usize, config: GraphConfig) -> FGraph {
    let mut graph = FGraph::with_config(config);
    for i in 0..n_roots {
        graph
            .add_root_node(&format!("x{}", i), "+", "-0", UNITS[i % UNITS.len()])
            .unwrap();
    }
    graph.add_layer("elsr2", "+-*:").unwrap();
    graph.add_layer("", "*:").unwrap();
    graph.generate().unwrap();
    graph
}

/// Deterministic random positive input rows.
fn random_input(seed: u64, n_rows: usize, n_cols: usize) -> DMatrix<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    DMatrix::from_fn(n_rows, n_cols, |_, _| rng.random_range(0.1..10.0))
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/generate");
    group.sample_size(10);

    for n_roots in [2, 4, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(n_roots), &n_roots, |b, &n_roots| {
            b.iter(|| black_box(build_graph(n_roots, GraphConfig::default())));
        });
    }

    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/apply");

    let n_roots = 4;
    for n_rows in [16, 1024, 16384] {
        let input = random_input(42, n_rows, n_roots);
        group.throughput(Throughput::Elements(n_rows as u64));

        for (name, threshold) in [("sequential", usize::MAX), ("parallel", 1)] {
            let graph = build_graph(
                n_roots,
                GraphConfig {
                    parallel_threshold: threshold,
                    ..GraphConfig::default()
                },
            );
            group.bench_with_input(BenchmarkId::new(name, n_rows), &input, |b, input| {
                b.iter(|| black_box(graph.apply(input).unwrap()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_apply);
criterion_main!(benches);
