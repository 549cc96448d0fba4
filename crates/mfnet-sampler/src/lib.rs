//! Gibbs sampling over a candidate graph.
//!
//! Each chain holds one candidate per compound and resamples compounds in
//! place from their full conditionals. Chains run independently on a rayon
//! pool and their visit frequencies are averaged into per-compound rankings.

pub mod aggregate;
pub mod chain;
pub mod orchestrator;
pub mod pipeline;

pub use aggregate::{CompoundRanking, RankedCandidate, ResultAggregator};
pub use chain::{Chain, ChainOutcome, ChainPhase, ChainSpec, VisitCounts};
pub use orchestrator::{ChainFailure, ChainTask, RunOrchestrator, RunOutcome};
pub use pipeline::{rerank, rerank_graph, NetworkDiagnostics, NetworkResult};
