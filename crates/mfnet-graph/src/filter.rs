use crate::edge_score::Edge;
use mfnet_core::{EdgeFilterPolicy, F};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Sparsifies the scored candidate-pair graph.
///
/// Output is sorted by edge key and depends only on the input edge set and
/// the policy, never on input order.
#[derive(Clone, Copy, Debug)]
pub struct EdgeFilter {
    policy: EdgeFilterPolicy,
}

impl EdgeFilter {
    pub fn new(policy: EdgeFilterPolicy) -> Self {
        Self { policy }
    }

    pub fn apply(&self, edges: Vec<Edge>, num_compounds: usize) -> Vec<Edge> {
        let before = edges.len();
        let mut kept = match self.policy {
            EdgeFilterPolicy::None => edges,
            EdgeFilterPolicy::GlobalThreshold { p } => global_threshold(edges, p),
            EdgeFilterPolicy::LocalTopK { k } => {
                let strongest = strongest_neighbors(&edges, num_compounds);
                let pairs = top_k_pairs(&strongest, k, |_| true);
                edges.into_iter().filter(|e| pairs.contains(&e.compound_pair())).collect()
            }
            EdgeFilterPolicy::Combined { p, k, min_local } => {
                combined(edges, num_compounds, p, k, min_local)
            }
        };
        kept.sort_by_key(|e| e.key());
        info!(policy = ?self.policy, before, after = kept.len(), "filtered edges");
        kept
    }
}

/// Weight descending, then edge key ascending.
fn by_strength(a: &Edge, b: &Edge) -> Ordering {
    b.weight.total_cmp(&a.weight).then_with(|| a.key().cmp(&b.key()))
}

/// Keeps the `ceil((1 - p) * n)` strongest edges.
fn global_threshold(mut edges: Vec<Edge>, p: F) -> Vec<Edge> {
    if p <= 0.0 {
        return edges;
    }
    if p >= 1.0 {
        return Vec::new();
    }
    // slack keeps e.g. (1 - 0.7) * 10 from rounding up to 4
    let keep = ((1.0 - p) * edges.len() as F - 1e-9).ceil().max(0.0) as usize;
    edges.sort_by(by_strength);
    edges.truncate(keep.min(edges.len()));
    edges
}

/// For every compound, its neighbor compounds mapped to the strongest edge
/// weight between the two.
fn strongest_neighbors(edges: &[Edge], num_compounds: usize) -> Vec<BTreeMap<usize, F>> {
    let mut strongest = vec![BTreeMap::new(); num_compounds];
    for e in edges {
        for (own, other) in [(e.compound_a, e.compound_b), (e.compound_b, e.compound_a)] {
            let slot = strongest[own].entry(other).or_insert(F::NEG_INFINITY);
            if e.weight > *slot {
                *slot = e.weight;
            }
        }
    }
    strongest
}

/// Canonical compound pairs linking each selected compound to its `k`
/// strongest neighbors (ties by lower neighbor index).
fn top_k_pairs(
    strongest: &[BTreeMap<usize, F>],
    k: usize,
    selected: impl Fn(usize) -> bool,
) -> BTreeSet<(usize, usize)> {
    let mut pairs = BTreeSet::new();
    for (own, neighbors) in strongest.iter().enumerate() {
        if !selected(own) {
            continue;
        }
        let mut ranked: Vec<(usize, F)> = neighbors.iter().map(|(&n, &w)| (n, w)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for &(other, _) in ranked.iter().take(k) {
            pairs.insert((own.min(other), own.max(other)));
        }
    }
    pairs
}

fn combined(edges: Vec<Edge>, num_compounds: usize, p: F, k: usize, min_local: usize) -> Vec<Edge> {
    let strongest = strongest_neighbors(&edges, num_compounds);
    let mut kept = global_threshold(edges.clone(), p);

    let surviving = strongest_neighbors(&kept, num_compounds);
    let forced = top_k_pairs(&strongest, k, |c| surviving[c].len() < min_local);
    if forced.is_empty() {
        return kept;
    }

    let present: BTreeSet<_> = kept.iter().map(|e| e.key()).collect();
    kept.extend(
        edges
            .into_iter()
            .filter(|e| forced.contains(&e.compound_pair()) && !present.contains(&e.key())),
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: usize, b: usize, w: F) -> Edge {
        Edge::new((a, 0), (b, 0), w).with_weight(w)
    }

    #[test]
    fn test_global_threshold_fraction() {
        let edges: Vec<Edge> = (0..10).map(|i| edge(0, i + 1, i as F)).collect();
        let kept = EdgeFilter::new(EdgeFilterPolicy::GlobalThreshold { p: 0.7 }).apply(edges, 11);
        assert_eq!(kept.len(), 3);
        let mut weights: Vec<F> = kept.iter().map(|e| e.weight).collect();
        weights.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(weights, vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_local_top_k_symmetric_union() {
        // compound 0 is a hub; compound 3 only links to 0 weakly
        let edges = vec![edge(0, 1, 5.0), edge(0, 2, 4.0), edge(0, 3, 0.1), edge(1, 2, 0.5)];
        let kept = EdgeFilter::new(EdgeFilterPolicy::LocalTopK { k: 1 }).apply(edges, 4);
        let pairs: Vec<(usize, usize)> = kept.iter().map(|e| e.compound_pair()).collect();
        // 0->1, 1->0, 2->0, 3->0
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3)]);
    }

    #[test]
    fn test_combined_rescues_weak_compound() {
        let edges = vec![edge(0, 1, 5.0), edge(0, 2, 4.0), edge(1, 2, 3.0), edge(2, 3, 0.1)];
        let policy = EdgeFilterPolicy::Combined { p: 0.5, k: 1, min_local: 1 };
        let kept = EdgeFilter::new(policy).apply(edges, 4);
        let pairs: Vec<(usize, usize)> = kept.iter().map(|e| e.compound_pair()).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (2, 3)]);
    }

    #[test]
    fn test_ties_resolved_by_key() {
        let edges = vec![edge(2, 3, 1.0), edge(0, 1, 1.0), edge(1, 2, 1.0)];
        let kept = EdgeFilter::new(EdgeFilterPolicy::GlobalThreshold { p: 0.5 }).apply(edges, 4);
        let pairs: Vec<(usize, usize)> = kept.iter().map(|e| e.compound_pair()).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }
}
