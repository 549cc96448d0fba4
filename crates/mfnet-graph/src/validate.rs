use crate::graph::Graph;
use mfnet_core::{NetworkConfig, NetworkError, F};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

/// Connectivity limits checked after filtering.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationThresholds {
    /// Fraction of isolated compounds above which the run aborts.
    pub max_isolated_fraction: F,
    /// Fraction of badly connected compounds above which a warning is raised.
    pub badly_connected_fraction: F,
    /// A compound with fewer neighbor compounds counts as badly connected.
    pub min_neighbor_compounds: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            max_isolated_fraction: 0.95,
            badly_connected_fraction: 0.25,
            min_neighbor_compounds: 5,
        }
    }
}

impl ValidationThresholds {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            max_isolated_fraction: config.max_isolated_fraction,
            badly_connected_fraction: config.badly_connected_fraction,
            min_neighbor_compounds: config.min_neighbor_compounds,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub severity: Severity,
    pub compounds: usize,
    pub isolated: usize,
    pub badly_connected: usize,
    pub messages: Vec<String>,
}

impl ValidationReport {
    pub fn isolated_fraction(&self) -> F {
        fraction(self.isolated, self.compounds)
    }

    pub fn badly_connected_fraction(&self) -> F {
        fraction(self.badly_connected, self.compounds)
    }

    /// `Err` for ERROR severity; warnings are logged and passed through.
    pub fn into_result(self) -> Result<Self, NetworkError> {
        match self.severity {
            Severity::Error => Err(NetworkError::GraphValidation(self.messages.join("; "))),
            Severity::Warning => {
                for msg in &self.messages {
                    warn!("graph validation: {}", msg);
                }
                Ok(self)
            }
            Severity::Ok => Ok(self),
        }
    }
}

fn fraction(n: usize, total: usize) -> F {
    if total == 0 {
        0.0
    } else {
        n as F / total as F
    }
}

impl Graph {
    /// Classifies the filtered graph's connectivity.
    pub fn validate(&self, thresholds: &ValidationThresholds) -> ValidationReport {
        let compounds = self.num_compounds();
        let counts = self.connection_counts();
        let isolated = counts.iter().filter(|&&c| c == 0).count();
        let badly_connected = counts
            .iter()
            .filter(|&&c| c < thresholds.min_neighbor_compounds)
            .count();

        let mut report = ValidationReport {
            severity: Severity::Ok,
            compounds,
            isolated,
            badly_connected,
            messages: Vec::new(),
        };

        if report.isolated_fraction() > thresholds.max_isolated_fraction {
            report.severity = Severity::Error;
            report.messages.push(format!(
                "{} of {} compounds ({:.1}%) have no connections after filtering, limit is {:.1}%",
                isolated,
                compounds,
                100.0 * report.isolated_fraction(),
                100.0 * thresholds.max_isolated_fraction
            ));
            return report;
        }

        if isolated > 0 {
            report.severity = Severity::Warning;
            report.messages.push(format!(
                "{} of {} compounds are isolated and keep their prior ranking",
                isolated, compounds
            ));
        }
        if report.badly_connected_fraction() > thresholds.badly_connected_fraction {
            report.severity = Severity::Warning;
            report.messages.push(format!(
                "{:.1}% of compounds have fewer than {} neighbor compounds; consider a weaker edge filter",
                100.0 * report.badly_connected_fraction(),
                thresholds.min_neighbor_compounds
            ));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_score::Edge;
    use mfnet_core::{Candidate, Compound};

    fn star(leaves: usize, isolated: usize) -> Graph {
        let n = 1 + leaves + isolated;
        let compounds: Vec<Compound> = (0..n)
            .map(|i| Compound::new(format!("c{}", i), vec![Candidate::dummy(0.0)]))
            .collect();
        let scores = vec![vec![0.0]; n];
        let edges = (1..=leaves).map(|i| Edge::new((0, 0), (i, 0), 1.0)).collect();
        Graph::new(compounds, scores, edges).unwrap()
    }

    #[test]
    fn test_ok_when_well_connected() {
        let g = star(4, 0);
        let thresholds = ValidationThresholds {
            min_neighbor_compounds: 1,
            ..Default::default()
        };
        let report = g.validate(&thresholds);
        assert_eq!(report.severity, Severity::Ok);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_warning_for_sparse_graph() {
        let report = star(4, 1).validate(&ValidationThresholds::default());
        assert_eq!(report.severity, Severity::Warning);
        assert_eq!(report.isolated, 1);
        assert_eq!(report.badly_connected, 6);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_error_when_mostly_isolated() {
        let thresholds = ValidationThresholds {
            max_isolated_fraction: 0.5,
            ..Default::default()
        };
        let report = star(1, 3).validate(&thresholds);
        assert_eq!(report.severity, Severity::Error);
        assert!(matches!(report.into_result(), Err(NetworkError::GraphValidation(_))));
    }

    #[test]
    fn test_fully_isolated_allowed_at_one() {
        let thresholds = ValidationThresholds {
            max_isolated_fraction: 1.0,
            ..Default::default()
        };
        let report = star(0, 2).validate(&thresholds);
        assert_eq!(report.severity, Severity::Warning);
    }
}
