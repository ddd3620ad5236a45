// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Range search over points in the plane.
//!
//! Builds a VP-style index over a jittered grid, runs one query eagerly and one
//! lazily, and prints the search statistics next to a linear scan.
//!
//! Run:
//! - `RUST_LOG=pivotree_index=debug cargo run -p pivotree_demos --example vectors_range_query`

use pivotree_index::{
    BuildConfig, FarthestFirst, Metric, Minkowski, SearchConfig, StrategyConfig, build_index,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let points: Vec<[f64; 2]> = (0..400)
        .map(|i| {
            let x = f64::from(i % 20);
            let y = f64::from(i / 20);
            [x + 0.01 * y, y + 0.01 * x]
        })
        .collect();

    let config = BuildConfig::new(StrategyConfig::Vp)
        .with_pivots(2)
        .with_max_leaf_size(8);
    let tree = match build_index(&Minkowski::Euclidean, &FarthestFirst, &config, points) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("build failed: {err}");
            return;
        }
    };
    println!(
        "== Index: {} objects, {} nodes, depth {} ==",
        tree.len(),
        tree.node_count(),
        tree.depth()
    );

    let query = [7.3, 11.8];
    let radius = 1.5;
    let (hits, stats) = match tree.range_query(
        &Minkowski::Euclidean,
        &query,
        radius,
        SearchConfig::default(),
    ) {
        Ok(found) => found,
        Err(err) => {
            eprintln!("search failed: {err}");
            return;
        }
    };

    println!("== Hits within {radius} of {query:?} ==");
    for hit in &hits {
        match hit.distance {
            Some(d) => println!("  {:?} at {:?}  d={d:.3}", hit.id, hit.object),
            None => println!("  {:?} at {:?}  (covered by a pivot bound)", hit.id, hit.object),
        }
    }

    let scan = tree
        .objects()
        .iter()
        .filter(|p| Minkowski::Euclidean.distance(*p, &query) <= radius)
        .count();
    println!("== Stats ==");
    println!("  hits: {} (linear scan: {scan})", hits.len());
    println!(
        "  distance computations: {} of {}",
        stats.distance_computations,
        tree.len()
    );
    println!(
        "  nodes visited: {} internal, {} leaf",
        stats.internal_node_visits, stats.leaf_node_visits
    );
    println!("  exclusion rate: {:.3}", stats.exclusion_rate());
    println!("  prune rate: {:.3}", stats.prune_rate());

    println!("== First three hits, lazily ==");
    let cursor = match tree.search(&Minkowski::Euclidean, &query, radius, SearchConfig::default()) {
        Ok(cursor) => cursor,
        Err(err) => {
            eprintln!("search failed: {err}");
            return;
        }
    };
    for hit in cursor.take(3) {
        match hit {
            Ok(hit) => println!("  {:?}", hit.id),
            Err(err) => {
                eprintln!("  node read failed: {err}");
                break;
            }
        }
    }
}
