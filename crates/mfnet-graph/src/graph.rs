use crate::edge_score::Edge;
use mfnet_core::{Candidate, CandidateStore, Compound, NetworkError, NodeScorer, F};

/// Edge weights between one compound's candidates and one neighbor's.
///
/// Dense `own × other` row-major block; pairs without an edge weigh 0.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborBlock {
    pub compound: usize,
    width: usize,
    weights: Vec<F>,
}

impl NeighborBlock {
    fn new(compound: usize, own: usize, width: usize) -> Self {
        Self {
            compound,
            width,
            weights: vec![0.0; own * width],
        }
    }

    pub fn weight(&self, own: usize, other: usize) -> F {
        self.weights[own * self.width + other]
    }

    fn add(&mut self, own: usize, other: usize, w: F) {
        self.weights[own * self.width + other] += w;
    }
}

/// The immutable candidate network shared by every chain.
///
/// There is no mutation path after [`Graph::new`]; chains hold it behind an
/// `Arc` and read it without locking.
#[derive(Clone, Debug)]
pub struct Graph {
    compounds: Vec<Compound>,
    node_scores: Vec<Vec<F>>,
    adjacency: Vec<Vec<NeighborBlock>>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Assembles the graph, rejecting shapes the sampler could not handle:
    /// empty candidate lists, node scores that do not line up, non-finite
    /// scores, negative or non-finite weights, out-of-range or same-compound
    /// edges. Edges naming the same candidate pair add up.
    pub fn new(compounds: Vec<Compound>, node_scores: Vec<Vec<F>>, edges: Vec<Edge>) -> Result<Self, NetworkError> {
        let invalid = |msg: String| Err(NetworkError::GraphValidation(msg));

        if node_scores.len() != compounds.len() {
            return invalid(format!(
                "{} node score rows for {} compounds",
                node_scores.len(),
                compounds.len()
            ));
        }
        for (idx, (compound, scores)) in compounds.iter().zip(&node_scores).enumerate() {
            if compound.is_empty() {
                return invalid(format!("compound {} ({}) has no candidates", idx, compound.id));
            }
            if scores.len() != compound.len() {
                return invalid(format!(
                    "compound {} has {} candidates but {} node scores",
                    idx,
                    compound.len(),
                    scores.len()
                ));
            }
            if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
                return invalid(format!("compound {} has non-finite node score {}", idx, bad));
            }
        }

        let mut adjacency: Vec<Vec<NeighborBlock>> = vec![Vec::new(); compounds.len()];
        for e in &edges {
            if e.compound_a == e.compound_b {
                return invalid(format!("self-pair edge on compound {}", e.compound_a));
            }
            if !(e.weight.is_finite() && e.weight >= 0.0) {
                return invalid(format!("edge {:?} has invalid weight {}", e.key(), e.weight));
            }
            let in_range = |c: usize, k: usize| c < compounds.len() && k < compounds[c].len();
            if !in_range(e.compound_a, e.candidate_a) || !in_range(e.compound_b, e.candidate_b) {
                return invalid(format!("edge {:?} points outside the candidate lists", e.key()));
            }

            for (own, own_cand, other, other_cand) in [
                (e.compound_a, e.candidate_a, e.compound_b, e.candidate_b),
                (e.compound_b, e.candidate_b, e.compound_a, e.candidate_a),
            ] {
                let blocks = &mut adjacency[own];
                let pos = match blocks.iter().position(|b| b.compound == other) {
                    Some(pos) => pos,
                    None => {
                        blocks.push(NeighborBlock::new(other, compounds[own].len(), compounds[other].len()));
                        blocks.len() - 1
                    }
                };
                blocks[pos].add(own_cand, other_cand, e.weight);
            }
        }
        for blocks in &mut adjacency {
            blocks.sort_by_key(|b| b.compound);
        }

        Ok(Self {
            compounds,
            node_scores,
            adjacency,
            edges,
        })
    }

    /// Scores every candidate of `store` with `scorer` and wires in `edges`.
    pub fn from_store<N: NodeScorer + ?Sized>(
        store: &CandidateStore,
        scorer: &N,
        edges: Vec<Edge>,
    ) -> Result<Self, NetworkError> {
        let node_scores = store
            .compounds()
            .iter()
            .map(|c| c.candidates.iter().map(|cand| scorer.score(cand)).collect())
            .collect();
        Self::new(store.compounds().to_vec(), node_scores, edges)
    }

    pub fn num_compounds(&self) -> usize {
        self.compounds.len()
    }

    pub fn num_candidates(&self, compound: usize) -> usize {
        self.compounds[compound].len()
    }

    pub fn total_candidates(&self) -> usize {
        self.compounds.iter().map(|c| c.len()).sum()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn compound(&self, compound: usize) -> &Compound {
        &self.compounds[compound]
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    pub fn candidate(&self, compound: usize, candidate: usize) -> &Candidate {
        &self.compounds[compound].candidates[candidate]
    }

    /// Prior log-weights of a compound's candidates.
    pub fn node_scores(&self, compound: usize) -> &[F] {
        &self.node_scores[compound]
    }

    /// Neighbor blocks of `compound`, sorted by neighbor index.
    pub fn neighbors(&self, compound: usize) -> &[NeighborBlock] {
        self.adjacency.get(compound).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of distinct neighbor compounds.
    pub fn connection_count(&self, compound: usize) -> usize {
        self.neighbors(compound).len()
    }

    pub fn connection_counts(&self) -> Vec<usize> {
        (0..self.num_compounds()).map(|c| self.connection_count(c)).collect()
    }

    pub fn is_isolated(&self, compound: usize) -> bool {
        self.neighbors(compound).is_empty()
    }

    /// Per candidate of `compound`, the number of neighbor compounds it has
    /// at least one positive edge to.
    pub fn candidate_connections(&self, compound: usize) -> Vec<usize> {
        let mut counts = vec![0; self.num_candidates(compound)];
        for block in self.neighbors(compound) {
            for (own, count) in counts.iter_mut().enumerate() {
                if (0..block.width).any(|other| block.weight(own, other) > 0.0) {
                    *count += 1;
                }
            }
        }
        counts
    }
}
