// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Every strategy and pivot mode must agree with a linear scan.

use pivotree_index::{
    BuildConfig, CandidateSources, Clusterer, CpConfig, CpSplit, FarthestFirst, IndexTree, Metric,
    Minkowski, NodeId, PctConfig, PivotMode, RandomPivots, SearchConfig, StrategyConfig,
    Workload, build_index,
};
use proptest::prelude::*;

type Point = [f64; 2];

fn strategy(index: usize, variant: bool) -> StrategyConfig {
    match index {
        0 => StrategyConfig::Vp,
        1 => StrategyConfig::Clustering,
        2 => StrategyConfig::Gh,
        3 => StrategyConfig::Gnat,
        4 => StrategyConfig::Pct(PctConfig {
            clusterer: if variant { Clusterer::Pam } else { Clusterer::KMeans },
            ..PctConfig::default()
        }),
        _ => StrategyConfig::Cp(CpConfig {
            split: if variant { CpSplit::Clustering } else { CpSplit::Balanced },
            workload: if variant { Workload::Neighborhood } else { Workload::Subset },
            ..CpConfig::default()
        }),
    }
}

fn config(
    strategy: StrategyConfig,
    pivots: usize,
    fanout: usize,
    leaf: usize,
    mode: usize,
) -> BuildConfig {
    let (pivots, fanout) = if matches!(strategy, StrategyConfig::Gh) {
        (2, 2)
    } else {
        (pivots, fanout)
    };
    let mode = match mode {
        0 => PivotMode::Local,
        1 => PivotMode::Global,
        _ => PivotMode::Mix {
            candidates: pivots + 3,
        },
    };
    BuildConfig::new(strategy)
        .with_pivots(pivots)
        .with_fanout(fanout)
        .with_max_leaf_size(leaf)
        .with_mode(mode)
}

fn brute<P: AsRef<[f64]>>(metric: Minkowski, data: &[P], q: &P, r: f64) -> Vec<usize> {
    (0..data.len())
        .filter(|&i| metric.distance(&data[i], q) <= r)
        .collect()
}

fn with_every_source(strategy: StrategyConfig) -> StrategyConfig {
    match strategy {
        StrategyConfig::Cp(cp) => StrategyConfig::Cp(CpConfig {
            sources: CandidateSources::all(),
            ..cp
        }),
        other => other,
    }
}

fn same_shape(a: &IndexTree<Point>, b: &IndexTree<Point>, id: NodeId) -> bool {
    let (Some(x), Some(y)) = (a.node(id), b.node(id)) else {
        return false;
    };
    x == y && x.children().iter().all(|&c| same_shape(a, b, c))
}

fn point() -> impl Strategy<Value = Point> {
    (0.0..10.0_f64, 0.0..10.0_f64).prop_map(|(x, y)| [x, y])
}

/// Small integer coordinates, so ties, duplicates and members exactly on the
/// query boundary are common.
fn grid_point() -> impl Strategy<Value = [f64; 4]> {
    [0_u8..4, 0_u8..4, 0_u8..4, 0_u8..4].prop_map(|c| c.map(f64::from))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn search_matches_linear_scan(
        data in prop::collection::vec(point(), 1..60),
        query in point(),
        radius in 0.0..6.0_f64,
        kind in 0_usize..6,
        variant in any::<bool>(),
        pivots in 1_usize..4,
        fanout in 2_usize..4,
        leaf in 1_usize..6,
        mode in 0_usize..3,
        shortcuts in any::<bool>(),
    ) {
        let cfg = config(strategy(kind, variant), pivots, fanout, leaf, mode);
        let tree = build_index(&Minkowski::Euclidean, &FarthestFirst, &cfg, data.clone()).unwrap();
        let search = SearchConfig {
            containment_shortcut: shortcuts,
            vertex_voting: shortcuts,
        };
        let (hits, stats) = tree
            .range_query(&Minkowski::Euclidean, &query, radius, search)
            .unwrap();

        let mut got: Vec<usize> = hits.iter().map(|h| h.id.index()).collect();
        let reported = got.len();
        got.sort_unstable();
        got.dedup();
        prop_assert_eq!(reported, got.len(), "an object was reported twice");
        prop_assert_eq!(got, brute(Minkowski::Euclidean, &data, &query, radius));
        for hit in &hits {
            if let Some(d) = hit.distance {
                prop_assert!(d <= radius);
            }
        }
        prop_assert!(stats.distance_computations <= data.len());
    }

    #[test]
    fn integer_grids_keep_boundary_members(
        data in prop::collection::vec(grid_point(), 1..50),
        query in grid_point(),
        radius in 0_u8..4,
        chebyshev in any::<bool>(),
        kind in 0_usize..6,
        variant in any::<bool>(),
        pivots in 1_usize..5,
        fanout in 2_usize..4,
        leaf in 1_usize..4,
        mode in 0_usize..3,
        seed in 0_u64..1000,
    ) {
        let metric = if chebyshev { Minkowski::Chebyshev } else { Minkowski::Manhattan };
        let radius = f64::from(radius);
        let cfg = config(with_every_source(strategy(kind, variant)), pivots, fanout, leaf, mode);
        let tree = build_index(&metric, &RandomPivots { seed }, &cfg, data.clone()).unwrap();
        let (hits, _) = tree.range_query(&metric, &query, radius, SearchConfig::default()).unwrap();

        let mut got: Vec<usize> = hits.iter().map(|h| h.id.index()).collect();
        got.sort_unstable();
        prop_assert_eq!(got, brute(metric, &data, &query, radius));
    }

    #[test]
    fn queries_at_stored_points_find_themselves(
        data in prop::collection::vec(point(), 2..40),
        kind in 0_usize..6,
        mode in 0_usize..3,
        pick in any::<prop::sample::Index>(),
    ) {
        let cfg = config(strategy(kind, false), 2, 2, 2, mode);
        let selector = RandomPivots { seed: 11 };
        let tree = build_index(&Minkowski::Euclidean, &selector, &cfg, data.clone()).unwrap();
        let i = pick.index(data.len());
        let (hits, _) = tree
            .range_query(&Minkowski::Euclidean, &data[i], 0.0, SearchConfig::default())
            .unwrap();
        prop_assert!(hits.iter().any(|h| h.id.index() == i));
    }

    #[test]
    fn rebuilding_is_deterministic(
        data in prop::collection::vec(point(), 1..50),
        kind in 0_usize..6,
        variant in any::<bool>(),
        mode in 0_usize..3,
    ) {
        let cfg = config(strategy(kind, variant), 2, 3, 3, mode);
        let selector = RandomPivots { seed: 5 };
        let a = build_index(&Minkowski::Euclidean, &selector, &cfg, data.clone()).unwrap();
        let b = build_index(&Minkowski::Euclidean, &selector, &cfg, data).unwrap();
        prop_assert_eq!(a.node_count(), b.node_count());
        prop_assert!(same_shape(&a, &b, a.root()));
    }
}
