use mfnet_core::{Candidate, Compound, Formula, F};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Weighted link between candidates of two different compounds.
///
/// Stored with `compound_a < compound_b`; the pair is undirected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub compound_a: usize,
    pub candidate_a: usize,
    pub compound_b: usize,
    pub candidate_b: usize,
    pub raw_score: F,
    pub weight: F,
}

impl Edge {
    /// Builds an edge with endpoints swapped into canonical order.
    pub fn new(a: (usize, usize), b: (usize, usize), raw_score: F) -> Self {
        let (lo, hi) = if a.0 <= b.0 { (a, b) } else { (b, a) };
        Self {
            compound_a: lo.0,
            candidate_a: lo.1,
            compound_b: hi.0,
            candidate_b: hi.1,
            raw_score,
            weight: raw_score,
        }
    }

    pub fn with_weight(mut self, weight: F) -> Self {
        self.weight = weight;
        self
    }

    pub fn key(&self) -> (usize, usize, usize, usize) {
        (self.compound_a, self.candidate_a, self.compound_b, self.candidate_b)
    }

    pub fn compound_pair(&self) -> (usize, usize) {
        (self.compound_a, self.compound_b)
    }
}

/// Raw compatibility between two candidates of different compounds.
pub trait EdgeScorer: Send + Sync {
    /// Called once with the full dataset before any pair is scored.
    fn prepare(&mut self, compounds: &[Compound]);

    /// Nonnegative and symmetric in its two arguments.
    fn score(&self, compound_a: usize, a: &Candidate, compound_b: usize, b: &Candidate) -> F;
}

/// Counts shared fragment and neutral-loss formulas, discounted by a minimum
/// overlap and normalized by the size of each compound's largest tree.
#[derive(Clone, Debug)]
pub struct CommonFragmentAndLossScorer {
    min_overlap: F,
    norms: Vec<F>,
}

impl CommonFragmentAndLossScorer {
    pub fn new(min_overlap: F) -> Self {
        Self {
            min_overlap,
            norms: Vec::new(),
        }
    }

    fn norm(&self, compound: usize) -> F {
        self.norms.get(compound).copied().unwrap_or(1.0)
    }
}

impl Default for CommonFragmentAndLossScorer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl EdgeScorer for CommonFragmentAndLossScorer {
    fn prepare(&mut self, compounds: &[Compound]) {
        self.norms = compounds
            .iter()
            .map(|compound| {
                let biggest_tree = compound
                    .candidates
                    .iter()
                    .filter(|c| !c.is_dummy)
                    .map(|c| c.tree_size())
                    .max()
                    .unwrap_or(0);
                (2.0 * biggest_tree as F - 1.0 - self.min_overlap).max(1.0)
            })
            .collect();
    }

    fn score(&self, compound_a: usize, a: &Candidate, compound_b: usize, b: &Candidate) -> F {
        if a.is_dummy || b.is_dummy {
            return 0.0;
        }
        let common = shared_count(&a.fragments, &b.fragments) + shared_count(&a.losses, &b.losses);
        let s = common as F - self.min_overlap;
        if s <= 0.0 {
            return 0.0;
        }
        s / self.norm(compound_a) + s / self.norm(compound_b)
    }
}

/// Size of the multiset intersection of two sorted slices.
pub fn shared_count(a: &[Formula], b: &[Formula]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

/// Result of scoring every cross-compound candidate pair.
#[derive(Clone, Debug)]
pub struct ScoredPairs {
    /// Pairs with a strictly positive raw score, in `(a, i, b, j)` order.
    pub edges: Vec<Edge>,
    pub pairs_scored: usize,
}

/// Scores all candidate pairs of distinct compounds in parallel.
///
/// Zero-score pairs are not edges and stay out of the calibration population.
pub fn score_all_pairs<S: EdgeScorer + ?Sized>(scorer: &S, compounds: &[Compound]) -> ScoredPairs {
    let per_compound: Vec<(Vec<Edge>, usize)> = (0..compounds.len())
        .into_par_iter()
        .map(|a| {
            let mut edges = Vec::new();
            let mut scored = 0;
            for b in (a + 1)..compounds.len() {
                for (i, ca) in compounds[a].candidates.iter().enumerate() {
                    for (j, cb) in compounds[b].candidates.iter().enumerate() {
                        scored += 1;
                        let raw = scorer.score(a, ca, b, cb);
                        if raw > 0.0 && raw.is_finite() {
                            edges.push(Edge::new((a, i), (b, j), raw));
                        }
                    }
                }
            }
            (edges, scored)
        })
        .collect();

    let pairs_scored = per_compound.iter().map(|(_, n)| n).sum();
    let edges = per_compound.into_iter().flat_map(|(e, _)| e).collect();
    ScoredPairs { edges, pairs_scored }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfnet_core::IonType;

    fn cand(fragments: &[&str], losses: &[&str]) -> Candidate {
        Candidate::new(Formula::new("X"), IonType::new("[M+H]+"), 0.0)
            .with_fragments(fragments.iter().map(|f| Formula::new(*f)).collect())
            .with_losses(losses.iter().map(|f| Formula::new(*f)).collect())
    }

    #[test]
    fn test_shared_count_multiset() {
        let a: Vec<Formula> = ["C", "C", "H2O", "N"].iter().map(|s| Formula::new(*s)).collect();
        let b: Vec<Formula> = ["C", "H2O", "H2O", "O"].iter().map(|s| Formula::new(*s)).collect();
        assert_eq!(shared_count(&a, &b), 2);
    }

    #[test]
    fn test_score_normalized_and_symmetric() {
        let a = cand(&["C1", "C2", "C3", "C4"], &["H2O"]);
        let b = cand(&["C1", "C2", "C3", "C9"], &["H2O", "CO2"]);
        let compounds = vec![
            Compound::new("a", vec![a.clone(), Candidate::dummy(-10.0)]),
            Compound::new("b", vec![b.clone(), Candidate::dummy(-10.0)]),
        ];
        let mut scorer = CommonFragmentAndLossScorer::new(1.0);
        scorer.prepare(&compounds);

        // common = 3 fragments + 1 loss = 4, s = 3; norm = 2*4 - 1 - 1 = 6
        let ab = scorer.score(0, &a, 1, &b);
        let ba = scorer.score(1, &b, 0, &a);
        assert!((ab - 1.0).abs() < 1e-12);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_overlap_floor_and_dummy() {
        let a = cand(&["C1"], &[]);
        let b = cand(&["C1"], &[]);
        let compounds = vec![Compound::new("a", vec![a.clone()]), Compound::new("b", vec![b.clone()])];
        let mut scorer = CommonFragmentAndLossScorer::new(1.0);
        scorer.prepare(&compounds);

        assert_eq!(scorer.score(0, &a, 1, &b), 0.0);
        assert_eq!(scorer.score(0, &Candidate::dummy(0.0), 1, &b), 0.0);
    }

    #[test]
    fn test_score_all_pairs_skips_zero_and_same_compound() {
        let shared = ["C1", "C2", "C3"];
        let compounds = vec![
            Compound::new("a", vec![cand(&shared, &[]), cand(&shared, &[]), Candidate::dummy(-10.0)]),
            Compound::new("b", vec![cand(&shared, &[]), cand(&["N1"], &[]), Candidate::dummy(-10.0)]),
        ];
        let mut scorer = CommonFragmentAndLossScorer::new(1.0);
        scorer.prepare(&compounds);
        let scored = score_all_pairs(&scorer, &compounds);

        assert_eq!(scored.pairs_scored, 9);
        assert_eq!(scored.edges.len(), 2);
        for e in &scored.edges {
            assert_ne!(e.compound_a, e.compound_b);
            assert_eq!((e.compound_b, e.candidate_b), (1, 0));
        }
    }

    #[test]
    fn test_edge_canonical_order() {
        let e = Edge::new((3, 1), (1, 2), 0.5);
        assert_eq!(e.key(), (1, 2, 3, 1));
    }
}
