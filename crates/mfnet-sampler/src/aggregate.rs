use crate::chain::ChainOutcome;
use mfnet_core::{softmax, Formula, IonType, F};
use mfnet_graph::Graph;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One candidate with its aggregated probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Position in the compound's candidate list.
    pub index: usize,
    pub formula: Formula,
    pub ion_type: IonType,
    pub probability: F,
    pub is_dummy: bool,
    pub is_corroborated: bool,
}

/// A compound's candidates ordered by descending probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompoundRanking {
    pub compound_id: String,
    /// Number of neighbor compounds that survived filtering.
    pub connections: usize,
    pub candidates: Vec<RankedCandidate>,
}

impl CompoundRanking {
    pub fn top(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }

    pub fn probability_of(&self, index: usize) -> Option<F> {
        self.candidates
            .iter()
            .find(|c| c.index == index)
            .map(|c| c.probability)
    }

    pub fn total_probability(&self) -> F {
        self.candidates.iter().map(|c| c.probability).sum()
    }
}

/// Averages per-chain posteriors and turns them into rankings.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Mean over chains of `visit-count / recorded sweeps`, per compound.
    ///
    /// Chains that recorded nothing are skipped; `None` if none recorded.
    pub fn posterior(graph: &Graph, outcomes: &[ChainOutcome]) -> Option<Vec<Vec<F>>> {
        let contributing: Vec<&ChainOutcome> = outcomes.iter().filter(|o| o.recorded_sweeps > 0).collect();
        if contributing.is_empty() {
            return None;
        }

        let weight = 1.0 / contributing.len() as F;
        let mut posterior: Vec<Vec<F>> = (0..graph.num_compounds())
            .map(|c| vec![0.0; graph.num_candidates(c)])
            .collect();

        for outcome in &contributing {
            for (compound, probs) in posterior.iter_mut().enumerate() {
                let total = outcome.counts.total(compound) as F;
                if total == 0.0 {
                    continue;
                }
                for (p, &count) in probs.iter_mut().zip(outcome.counts.row(compound)) {
                    *p += weight * count as F / total;
                }
            }
        }

        for probs in &mut posterior {
            let sum: F = probs.iter().sum();
            if sum > 0.0 {
                for p in probs.iter_mut() {
                    *p /= sum;
                }
            }
        }

        info!(
            chains = contributing.len(),
            skipped = outcomes.len() - contributing.len(),
            "aggregated chain posteriors"
        );
        Some(posterior)
    }

    /// Softmax of the node scores alone, ignoring every edge.
    pub fn prior(graph: &Graph) -> Vec<Vec<F>> {
        (0..graph.num_compounds())
            .map(|c| softmax(graph.node_scores(c)))
            .collect()
    }

    /// Descending rankings; equal probabilities keep candidate order.
    pub fn rank(graph: &Graph, probabilities: &[Vec<F>]) -> Vec<CompoundRanking> {
        probabilities
            .iter()
            .enumerate()
            .map(|(c, probs)| {
                let compound = graph.compound(c);
                let mut candidates: Vec<RankedCandidate> = probs
                    .iter()
                    .enumerate()
                    .map(|(index, &probability)| {
                        let cand = &compound.candidates[index];
                        RankedCandidate {
                            index,
                            formula: cand.formula.clone(),
                            ion_type: cand.ion_type.clone(),
                            probability,
                            is_dummy: cand.is_dummy,
                            is_corroborated: cand.is_corroborated,
                        }
                    })
                    .collect();
                candidates.sort_by(|a, b| {
                    b.probability
                        .total_cmp(&a.probability)
                        .then_with(|| a.index.cmp(&b.index))
                });
                CompoundRanking {
                    compound_id: compound.id.clone(),
                    connections: graph.connection_count(c),
                    candidates,
                }
            })
            .collect()
    }
}
