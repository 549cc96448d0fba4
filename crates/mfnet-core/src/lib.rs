pub mod candidate;
pub mod cluster;
pub mod config;
pub mod corroboration;
pub mod error;
pub mod node;
pub mod rng;
pub mod store;

// Core types
pub type F = f64;
pub use candidate::{Candidate, Compound, Formula, IonType, RawCandidate};
pub use rng::ChainRng;

// Configuration and errors
pub use config::{
    CalibrationFamily, EdgeFilterPolicy, InitStrategy, NetworkConfig, SweepOrder, WeightMapping,
};
pub use error::{ConfigurationError, DataError, NetworkError};

// Candidate input and priors
pub use corroboration::{ExactFormula, FormulaCompatibility, LibraryHit, TrustPolicy};
pub use node::{softmax, NodeScorer, StandardNodeScorer};
pub use cluster::MassWindow;
pub use store::{CandidateStore, StoreBuilder, StoreReport};
