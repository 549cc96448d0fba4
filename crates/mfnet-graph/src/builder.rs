use crate::calibrate::{Calibration, ScoreCalibrator};
use crate::edge_score::{score_all_pairs, CommonFragmentAndLossScorer, EdgeScorer};
use crate::filter::EdgeFilter;
use crate::graph::Graph;
use mfnet_core::{CandidateStore, NetworkConfig, NetworkError, NodeScorer, StandardNodeScorer};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Counts gathered while turning a store into a graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub pairs_scored: usize,
    pub edges_before_filter: usize,
    pub edges_after_filter: usize,
    pub calibration: Calibration,
}

/// Scores, calibrates and filters candidate pairs, then assembles the graph.
pub struct GraphBuilder<S = CommonFragmentAndLossScorer, N = StandardNodeScorer> {
    edge_scorer: S,
    node_scorer: N,
    calibrator: ScoreCalibrator,
    filter: EdgeFilter,
}

impl GraphBuilder {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            edge_scorer: CommonFragmentAndLossScorer::new(config.min_overlap),
            node_scorer: StandardNodeScorer::new(config.corroboration_bonus),
            calibrator: ScoreCalibrator::from_config(config),
            filter: EdgeFilter::new(config.edge_filter),
        }
    }
}

impl<S: EdgeScorer, N: NodeScorer> GraphBuilder<S, N> {
    pub fn with_edge_scorer<S2: EdgeScorer>(self, edge_scorer: S2) -> GraphBuilder<S2, N> {
        GraphBuilder {
            edge_scorer,
            node_scorer: self.node_scorer,
            calibrator: self.calibrator,
            filter: self.filter,
        }
    }

    pub fn with_node_scorer<N2: NodeScorer>(self, node_scorer: N2) -> GraphBuilder<S, N2> {
        GraphBuilder {
            edge_scorer: self.edge_scorer,
            node_scorer,
            calibrator: self.calibrator,
            filter: self.filter,
        }
    }

    pub fn with_calibrator(mut self, calibrator: ScoreCalibrator) -> Self {
        self.calibrator = calibrator;
        self
    }

    pub fn with_filter(mut self, filter: EdgeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn build(mut self, store: &CandidateStore) -> Result<(Graph, BuildReport), NetworkError> {
        if store.is_empty() {
            return Err(NetworkError::EmptyDataset);
        }
        let start = Instant::now();

        self.edge_scorer.prepare(store.compounds());
        let scored = score_all_pairs(&self.edge_scorer, store.compounds());
        let mut edges = scored.edges;
        let edges_before_filter = edges.len();

        let calibration = self.calibrator.calibrate(&mut edges);
        let edges = self.filter.apply(edges, store.len());
        let edges_after_filter = edges.len();

        let graph = Graph::from_store(store, &self.node_scorer, edges)?;
        info!(
            compounds = graph.num_compounds(),
            candidates = graph.total_candidates(),
            pairs_scored = scored.pairs_scored,
            edges = edges_after_filter,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built candidate graph"
        );

        Ok((
            graph,
            BuildReport {
                pairs_scored: scored.pairs_scored,
                edges_before_filter,
                edges_after_filter,
                calibration,
            },
        ))
    }
}
