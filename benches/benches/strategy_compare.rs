// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use pivotree_index::{
    BuildConfig, CpConfig, CpSplit, FarthestFirst, Minkowski, PctConfig, PivotMode, SearchConfig,
    StrategyConfig, build_index,
};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_uniform(count: usize, seed: u64) -> Vec<[f64; 4]> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| core::array::from_fn(|_| rng.next_f64()))
        .collect()
}

fn gen_clustered(count: usize, centers: usize, spread: f64, seed: u64) -> Vec<[f64; 4]> {
    let mut rng = Rng::new(seed);
    let hubs = gen_uniform(centers, seed ^ 0x9e37_79b9);
    (0..count)
        .map(|i| {
            let hub = hubs[i % centers];
            core::array::from_fn(|d| hub[d] + (rng.next_f64() - 0.5) * spread)
        })
        .collect()
}

fn strategies() -> Vec<(&'static str, BuildConfig)> {
    vec![
        ("vp", BuildConfig::new(StrategyConfig::Vp)),
        (
            "clustering",
            BuildConfig::new(StrategyConfig::Clustering).with_fanout(3),
        ),
        ("gh", BuildConfig::new(StrategyConfig::Gh)),
        ("gnat", BuildConfig::new(StrategyConfig::Gnat).with_pivots(4)),
        (
            "pct",
            BuildConfig::new(StrategyConfig::Pct(PctConfig::default()))
                .with_pivots(3)
                .with_fanout(4),
        ),
        (
            "cp_balanced",
            BuildConfig::new(StrategyConfig::Cp(CpConfig::default())).with_pivots(3),
        ),
        (
            "cp_clustering",
            BuildConfig::new(StrategyConfig::Cp(CpConfig {
                split: CpSplit::Clustering,
                ..CpConfig::default()
            }))
            .with_pivots(3),
        ),
    ]
}

fn bench_build(c: &mut Criterion) {
    let data = gen_uniform(4_000, 0xdead_beef);
    let mut group = c.benchmark_group("build");
    group.throughput(Throughput::Elements(data.len() as u64));
    for (name, config) in strategies() {
        group.bench_function(name, |b| {
            b.iter_batched(
                || data.clone(),
                |points| {
                    let tree =
                        build_index(&Minkowski::Euclidean, &FarthestFirst, &config, points)
                            .unwrap();
                    black_box(tree.node_count());
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion, label: &str, data: &[[f64; 4]], radius: f64) {
    let queries = gen_uniform(64, 0x1234_5678);
    let mut group = c.benchmark_group(label);
    group.throughput(Throughput::Elements(queries.len() as u64));
    for (name, config) in strategies() {
        let tree =
            build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data.to_vec()).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut total = 0;
                for q in &queries {
                    let (hits, _) = tree
                        .range_query(&Minkowski::Euclidean, q, radius, SearchConfig::default())
                        .unwrap();
                    total += hits.len();
                }
                black_box(total);
            });
        });
    }
    group.finish();
}

fn bench_query_uniform(c: &mut Criterion) {
    bench_query(c, "query_uniform", &gen_uniform(4_000, 0xdead_beef), 0.15);
}

fn bench_query_clustered(c: &mut Criterion) {
    bench_query(
        c,
        "query_clustered",
        &gen_clustered(4_000, 12, 0.1, 0xfeed_face),
        0.1,
    );
}

fn bench_pivot_modes(c: &mut Criterion) {
    let data = gen_clustered(4_000, 12, 0.1, 0xfeed_face);
    let queries = gen_uniform(64, 0x1234_5678);
    let mut group = c.benchmark_group("pivot_modes");
    group.throughput(Throughput::Elements(queries.len() as u64));
    let modes = [
        ("local", PivotMode::Local),
        ("global", PivotMode::Global),
        ("mix", PivotMode::Mix { candidates: 8 }),
    ];
    for (name, mode) in modes {
        let config = BuildConfig::new(StrategyConfig::Vp)
            .with_pivots(3)
            .with_mode(mode);
        let tree =
            build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data.clone()).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut computed = 0;
                for q in &queries {
                    let (_, stats) = tree
                        .range_query(&Minkowski::Euclidean, q, 0.1, SearchConfig::default())
                        .unwrap();
                    computed += stats.distance_computations;
                }
                black_box(computed);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_query_uniform,
    bench_query_clustered,
    bench_pivot_modes,
);
criterion_main!(benches);
