pub mod builder;
pub mod calibrate;
pub mod edge_score;
pub mod filter;
pub mod graph;
pub mod validate;

pub use builder::{BuildReport, GraphBuilder};
pub use calibrate::{Calibration, ScoreCalibrator};
pub use edge_score::{score_all_pairs, CommonFragmentAndLossScorer, Edge, EdgeScorer, ScoredPairs};
pub use filter::EdgeFilter;
pub use graph::{Graph, NeighborBlock};
pub use validate::{Severity, ValidationReport, ValidationThresholds};
