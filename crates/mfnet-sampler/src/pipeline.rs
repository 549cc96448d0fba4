use crate::aggregate::{CompoundRanking, RankedCandidate, ResultAggregator};
use crate::orchestrator::RunOrchestrator;
use mfnet_core::{CandidateStore, NetworkConfig, NetworkError, F};
use mfnet_graph::{BuildReport, Calibration, Graph, GraphBuilder, ValidationReport, ValidationThresholds};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run statistics reported next to the rankings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkDiagnostics {
    pub compounds: usize,
    pub candidates: usize,
    pub dropped_candidates: usize,
    pub truncated_candidates: usize,
    pub corroborated_candidates: usize,
    /// Input compounds that were merged into a representative.
    pub clustered_compounds: usize,
    pub pairs_scored: usize,
    pub edges_before_filter: usize,
    pub edges_after_filter: usize,
    pub calibration: Option<Calibration>,
    pub validation: ValidationReport,
    pub chains_ok: usize,
    pub chains_failed: usize,
    pub chains_timed_out: usize,
    pub recorded_sweeps: usize,
    /// Set when no chain recorded a sweep and the prior was reported instead.
    pub used_prior_fallback: bool,
    pub elapsed_secs: F,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkResult {
    /// Posterior rankings from the sampled network.
    pub network_ranking: Vec<CompoundRanking>,
    /// Rankings from node scores alone.
    pub prior_ranking: Vec<CompoundRanking>,
    pub diagnostics: NetworkDiagnostics,
}

impl NetworkResult {
    pub fn ranking(&self, compound_id: &str) -> Option<&CompoundRanking> {
        self.network_ranking.iter().find(|r| r.compound_id == compound_id)
    }

    pub fn top_candidate(&self, compound_id: &str) -> Option<&RankedCandidate> {
        self.ranking(compound_id).and_then(|r| r.top())
    }

    /// Surviving graph connections per ranked compound.
    pub fn connection_counts(&self) -> Vec<usize> {
        self.network_ranking.iter().map(|r| r.connections).collect()
    }
}

/// Builds the network from `store` and samples it.
///
/// Every member of a compound cluster gets a copy of its representative's
/// ranking under its own id.
pub fn rerank(store: &CandidateStore, config: &NetworkConfig) -> Result<NetworkResult, NetworkError> {
    config.validate()?;
    if store.is_empty() {
        return Err(NetworkError::EmptyDataset);
    }
    let start = Instant::now();

    let (graph, build) = GraphBuilder::from_config(config).build(store)?;
    let mut result = sample(Arc::new(graph), config, Some(build), start)?;

    let report = store.report();
    result.diagnostics.dropped_candidates = report.dropped.len();
    result.diagnostics.truncated_candidates = report.truncated;
    result.diagnostics.corroborated_candidates = report.corroborated;
    if report.clustered > 0 {
        result.diagnostics.clustered_compounds = report.clustered;
        result.network_ranking = expand_clusters(store, result.network_ranking);
        result.prior_ranking = expand_clusters(store, result.prior_ranking);
    }
    Ok(result)
}

fn expand_clusters(store: &CandidateStore, rankings: Vec<CompoundRanking>) -> Vec<CompoundRanking> {
    let mut expanded = Vec::with_capacity(rankings.len() + store.report().clustered);
    for (idx, ranking) in rankings.into_iter().enumerate() {
        let copies: Vec<CompoundRanking> = store
            .members(idx)
            .iter()
            .skip(1)
            .map(|member| CompoundRanking {
                compound_id: member.clone(),
                ..ranking.clone()
            })
            .collect();
        expanded.push(ranking);
        expanded.extend(copies);
    }
    expanded
}

/// Samples an already assembled graph, e.g. one with hand-made edges.
pub fn rerank_graph(graph: Arc<Graph>, config: &NetworkConfig) -> Result<NetworkResult, NetworkError> {
    config.validate()?;
    if graph.num_compounds() == 0 {
        return Err(NetworkError::EmptyDataset);
    }
    sample(graph, config, None, Instant::now())
}

fn sample(
    graph: Arc<Graph>,
    config: &NetworkConfig,
    build: Option<BuildReport>,
    start: Instant,
) -> Result<NetworkResult, NetworkError> {
    let validation = graph
        .validate(&ValidationThresholds::from_config(config))
        .into_result()?;

    let run = RunOrchestrator::new(config).run(Arc::clone(&graph))?;

    let prior = ResultAggregator::prior(&graph);
    let (posterior, used_prior_fallback) = match ResultAggregator::posterior(&graph, &run.outcomes) {
        Some(posterior) => (posterior, false),
        None => {
            warn!("no chain recorded a sampling sweep before the deadline, reporting prior ranking");
            (prior.clone(), true)
        }
    };

    let diagnostics = NetworkDiagnostics {
        compounds: graph.num_compounds(),
        candidates: graph.total_candidates(),
        dropped_candidates: 0,
        truncated_candidates: 0,
        corroborated_candidates: 0,
        clustered_compounds: 0,
        pairs_scored: build.as_ref().map_or(0, |b| b.pairs_scored),
        edges_before_filter: build.as_ref().map_or(graph.num_edges(), |b| b.edges_before_filter),
        edges_after_filter: graph.num_edges(),
        calibration: build.map(|b| b.calibration),
        validation,
        chains_ok: run.outcomes.len(),
        chains_failed: run.failures.len(),
        chains_timed_out: run.timed_out(),
        recorded_sweeps: run.recorded_sweeps(),
        used_prior_fallback,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };

    let network_ranking = ResultAggregator::rank(&graph, &posterior);
    let prior_ranking = ResultAggregator::rank(&graph, &prior);

    let changed = network_ranking
        .iter()
        .zip(&prior_ranking)
        .filter(|(n, p)| n.top().map(|c| c.index) != p.top().map(|c| c.index))
        .count();
    info!(
        compounds = diagnostics.compounds,
        changed_top = changed,
        elapsed_secs = diagnostics.elapsed_secs,
        "reranking finished"
    );

    Ok(NetworkResult {
        network_ranking,
        prior_ranking,
        diagnostics,
    })
}
