// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strategy tour.
//!
//! Indexes the same word list under edit distance with every partition
//! strategy, then under a coordinate metric with PCT and CP, and prints how much
//! work each one saves for the same query.
//!
//! Run:
//! - `cargo run -p pivotree_demos --example strategies_tour`

use pivotree_index::{
    BuildConfig, CpConfig, FarthestFirst, MetricFn, Minkowski, PctConfig, PivotMode, SearchConfig,
    StrategyConfig, build_index,
};
use tracing_subscriber::EnvFilter;

const WORDS: &[&str] = &[
    "pivot", "pilot", "plot", "point", "print", "paint", "pint", "pine", "spine", "shine", "shone",
    "stone", "store", "score", "scare", "share", "shard", "hard", "card", "cart", "part", "port",
    "sort", "short", "shirt", "skirt", "skit", "skip", "ship", "shop", "stop", "step", "stem",
    "item", "iter", "inter", "enter", "center", "centre", "metric", "matrix", "mature", "nature",
    "native", "motive", "notice", "novice", "voice", "choice", "chosen",
];

fn levenshtein(a: &str, b: &str) -> f64 {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()] as f64
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let words: Vec<String> = WORDS.iter().map(|w| (*w).to_owned()).collect();
    let metric = MetricFn(|a: &String, b: &String| levenshtein(a, b));
    let query = String::from("shore");

    println!("== Words within edit distance 1 of {query:?} ==");
    let configs = [
        ("vp", BuildConfig::new(StrategyConfig::Vp)),
        (
            "clustering",
            BuildConfig::new(StrategyConfig::Clustering).with_fanout(3),
        ),
        ("gh", BuildConfig::new(StrategyConfig::Gh)),
        ("gnat", BuildConfig::new(StrategyConfig::Gnat).with_pivots(3)),
        (
            "gnat/mix",
            BuildConfig::new(StrategyConfig::Gnat)
                .with_pivots(3)
                .with_mode(PivotMode::Mix { candidates: 6 }),
        ),
    ];
    for (name, config) in configs {
        let config = config.with_max_leaf_size(4);
        let tree = match build_index(&metric, &FarthestFirst, &config, words.clone()) {
            Ok(tree) => tree,
            Err(err) => {
                eprintln!("{name}: build failed: {err}");
                continue;
            }
        };
        match tree.range_query(&metric, &query, 1.0, SearchConfig::default()) {
            Ok((hits, stats)) => {
                let mut found: Vec<&str> = hits.iter().map(|h| h.object.as_str()).collect();
                found.sort_unstable();
                println!(
                    "  {name:<10} {:>2} distances, {} nodes: {found:?}",
                    stats.distance_computations,
                    stats.node_visits()
                );
            }
            Err(err) => eprintln!("{name}: search failed: {err}"),
        }
    }

    println!("== Pivot-space strategies on 3-D points ==");
    let points: Vec<[f64; 3]> = (0..512)
        .map(|i| {
            let i = f64::from(i);
            [(i * 0.37) % 8.0, (i * 0.61) % 8.0, (i * 0.83) % 8.0]
        })
        .collect();
    let configs = [
        (
            "pct",
            BuildConfig::new(StrategyConfig::Pct(PctConfig::default())).with_fanout(4),
        ),
        (
            "cp",
            BuildConfig::new(StrategyConfig::Cp(CpConfig::default())).with_pivots(3),
        ),
    ];
    let center = [4.0, 4.0, 4.0];
    for (name, config) in configs {
        let built = build_index(&Minkowski::Euclidean, &FarthestFirst, &config, points.clone());
        let tree = match built {
            Ok(tree) => tree,
            Err(err) => {
                eprintln!("{name}: build failed: {err}");
                continue;
            }
        };
        for voting in [false, true] {
            let search = SearchConfig {
                containment_shortcut: true,
                vertex_voting: voting,
            };
            match tree.range_query(&Minkowski::Euclidean, &center, 1.0, search) {
                Ok((hits, stats)) => println!(
                    "  {name:<4} voting={voting:<5} hits={:<3} distances={:<3} exclusion={:.3}",
                    hits.len(),
                    stats.distance_computations,
                    stats.exclusion_rate()
                ),
                Err(err) => eprintln!("{name}: search failed: {err}"),
            }
        }
    }
}
