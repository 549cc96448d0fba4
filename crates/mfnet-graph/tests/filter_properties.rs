use mfnet_core::{EdgeFilterPolicy, F};
use mfnet_graph::{Edge, EdgeFilter};
use proptest::prelude::*;

fn random_edges(n_compounds: usize, weights: &[F]) -> Vec<Edge> {
    // spread the weights over distinct compound pairs, two candidates each
    let mut edges = Vec::new();
    let mut idx = 0;
    'outer: for a in 0..n_compounds {
        for b in (a + 1)..n_compounds {
            for cand in 0..2 {
                if idx == weights.len() {
                    break 'outer;
                }
                edges.push(Edge::new((a, cand), (b, 1 - cand), 1.0).with_weight(weights[idx]));
                idx += 1;
            }
        }
    }
    edges
}

#[test]
fn global_threshold_extremes() {
    let weights: Vec<F> = (0..40).map(|i| 0.025 * i as F + 0.01).collect();
    let edges = random_edges(8, &weights);
    let n = edges.len();

    let all = EdgeFilter::new(EdgeFilterPolicy::GlobalThreshold { p: 0.0 }).apply(edges.clone(), 8);
    let none = EdgeFilter::new(EdgeFilterPolicy::GlobalThreshold { p: 1.0 }).apply(edges, 8);

    println!("GlobalThreshold(0) kept {} / {}", all.len(), n);
    println!("GlobalThreshold(1) kept {} / {}", none.len(), n);
    assert_eq!(all.len(), n);
    assert!(none.is_empty());
}

proptest! {
    #[test]
    fn filtering_is_order_independent(
        weights in prop::collection::vec(0.0f64..1.0, 1..60),
        p in 0.0f64..1.0,
        k in 1usize..4,
    ) {
        let edges = random_edges(9, &weights);
        let mut reversed = edges.clone();
        reversed.reverse();

        for policy in [
            EdgeFilterPolicy::GlobalThreshold { p },
            EdgeFilterPolicy::LocalTopK { k },
            EdgeFilterPolicy::Combined { p, k, min_local: k },
            EdgeFilterPolicy::None,
        ] {
            let filter = EdgeFilter::new(policy);
            prop_assert_eq!(filter.apply(edges.clone(), 9), filter.apply(reversed.clone(), 9));
        }
    }

    #[test]
    fn kept_edges_are_a_subset(
        weights in prop::collection::vec(0.0f64..1.0, 1..60),
        p in 0.0f64..1.0,
        k in 1usize..4,
        min_local in 0usize..4,
    ) {
        let edges = random_edges(9, &weights);
        let min_local = min_local.min(k);
        let kept = EdgeFilter::new(EdgeFilterPolicy::Combined { p, k, min_local }).apply(edges.clone(), 9);
        prop_assert!(kept.len() <= edges.len());
        for e in &kept {
            prop_assert!(edges.contains(e));
        }
        let global = EdgeFilter::new(EdgeFilterPolicy::GlobalThreshold { p }).apply(edges, 9);
        prop_assert!(kept.len() >= global.len());
    }
}
