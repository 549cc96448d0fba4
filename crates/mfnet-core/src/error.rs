//! Error types shared by every mfnet crate.

use crate::F;
use thiserror::Error;

/// Fatal errors that abort a reranking run before any result is produced.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Run parameters are out of range or contradict each other.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Structural defect found after filtering, or a malformed graph handed
    /// to `Graph::new`.
    #[error("graph validation error: {0}")]
    GraphValidation(String),

    #[error("dataset contains no compounds")]
    EmptyDataset,

    /// Every chain panicked, so there is nothing to aggregate.
    #[error("all {chains} chains failed")]
    AllChainsFailed { chains: usize },

    #[error("worker pool error: {0}")]
    ThreadPool(String),
}

/// Parameter problems detected by `NetworkConfig::validate`.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: String,
    },

    #[error("{0}")]
    Contradiction(String),
}

impl ConfigurationError {
    pub fn out_of_range(field: &'static str, requirement: &'static str, value: impl ToString) -> Self {
        ConfigurationError::OutOfRange {
            field,
            requirement,
            value: value.to_string(),
        }
    }
}

/// Malformed candidate input. Recoverable: the candidate is dropped.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DataError {
    #[error("compound {compound}: candidate {formula} has no score")]
    MissingScore { compound: String, formula: String },

    #[error("compound {compound}: candidate {formula} has non-finite score {score}")]
    NonFiniteScore {
        compound: String,
        formula: String,
        score: F,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_converts() {
        let err: NetworkError = ConfigurationError::out_of_range("chains", "> 0", 0).into();
        assert!(matches!(err, NetworkError::Configuration(_)));
        assert_eq!(
            err.to_string(),
            "configuration error: chains must be > 0, got 0"
        );
    }

    #[test]
    fn test_data_error_message() {
        let err = DataError::MissingScore {
            compound: "c1".into(),
            formula: "C6H12O6".into(),
        };
        assert_eq!(err.to_string(), "compound c1: candidate C6H12O6 has no score");
    }
}
