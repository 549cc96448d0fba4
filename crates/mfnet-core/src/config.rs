use crate::error::ConfigurationError;
use crate::F;
use serde::{Deserialize, Serialize};

/// How each chain picks its starting assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStrategy {
    /// Highest base score per compound.
    BestScore,
    /// Uniform over each compound's candidates.
    Random,
}

/// Order in which compounds are visited within a sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOrder {
    Fixed,
    /// Fresh permutation from the chain RNG before every sweep.
    Shuffled,
}

/// Sparsification policy applied to the scored candidate-pair graph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EdgeFilterPolicy {
    /// Keep the top `1 - p` fraction of edges by calibrated weight.
    GlobalThreshold { p: F },
    /// Keep edges to each compound's `k` most strongly connected neighbors.
    LocalTopK { k: usize },
    /// Global threshold, then top-`k` neighbors force-added for any compound
    /// left with fewer than `min_local` neighbor compounds.
    Combined { p: F, k: usize, min_local: usize },
    None,
}

/// Distribution family fitted to the raw edge score population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationFamily {
    Exponential,
    LogNormal,
}

/// How a fitted CDF value becomes an edge weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMapping {
    /// `F(raw)`, in `[0, 1]`.
    Probability,
    /// `-ln(1 - F(raw))`, capped.
    Survival,
}

/// Every tunable of a reranking run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub sampling_sweeps: usize,
    pub burn_in_sweeps: usize,
    pub thinning: usize,
    pub chains: usize,
    pub workers: usize,
    pub seed: u64,
    pub init: InitStrategy,
    pub sweep_order: SweepOrder,
    pub time_limit_secs: Option<F>,

    pub edge_filter: EdgeFilterPolicy,
    pub calibration: CalibrationFamily,
    pub weight_mapping: WeightMapping,
    pub min_calibration_samples: usize,
    pub min_overlap: F,

    pub dummy_score: F,
    pub max_candidates: Option<usize>,
    pub corroboration_bonus: F,
    pub min_shared_peaks: usize,
    pub min_similarity: F,

    /// Merge near-duplicate compounds before building the graph.
    pub cluster_compounds: bool,
    /// Precursor mass window for clustering: the larger of `cluster_ppm`
    /// relative to the first mass and `cluster_abs_mass` in Da.
    pub cluster_ppm: F,
    pub cluster_abs_mass: F,

    pub max_isolated_fraction: F,
    pub badly_connected_fraction: F,
    pub min_neighbor_compounds: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            sampling_sweeps: 1000,
            burn_in_sweeps: 100,
            thinning: 1,
            chains: 10,
            workers: default_workers(),
            seed: 42,
            init: InitStrategy::BestScore,
            sweep_order: SweepOrder::Shuffled,
            time_limit_secs: None,
            edge_filter: EdgeFilterPolicy::Combined {
                p: 0.95,
                k: 10,
                min_local: 10,
            },
            calibration: CalibrationFamily::Exponential,
            weight_mapping: WeightMapping::Probability,
            min_calibration_samples: 10,
            min_overlap: 1.0,
            dummy_score: -10.0,
            max_candidates: None,
            corroboration_bonus: 2.0,
            min_shared_peaks: 5,
            min_similarity: 0.0,
            cluster_compounds: false,
            cluster_ppm: 10.0,
            cluster_abs_mass: 0.005,
            max_isolated_fraction: 0.95,
            badly_connected_fraction: 0.25,
            min_neighbor_compounds: 5,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn check_fraction(field: &'static str, value: F) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::out_of_range(field, "within [0, 1]", value))
    }
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweeps(mut self, burn_in_sweeps: usize, sampling_sweeps: usize) -> Self {
        self.burn_in_sweeps = burn_in_sweeps;
        self.sampling_sweeps = sampling_sweeps;
        self
    }

    pub fn with_chains(mut self, chains: usize) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_thinning(mut self, thinning: usize) -> Self {
        self.thinning = thinning;
        self
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    pub fn with_sweep_order(mut self, order: SweepOrder) -> Self {
        self.sweep_order = order;
        self
    }

    pub fn with_time_limit(mut self, secs: F) -> Self {
        self.time_limit_secs = Some(secs);
        self
    }

    pub fn with_edge_filter(mut self, policy: EdgeFilterPolicy) -> Self {
        self.edge_filter = policy;
        self
    }

    pub fn with_calibration(mut self, family: CalibrationFamily, mapping: WeightMapping) -> Self {
        self.calibration = family;
        self.weight_mapping = mapping;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = Some(max_candidates);
        self
    }

    pub fn with_clustering(mut self, enabled: bool) -> Self {
        self.cluster_compounds = enabled;
        self
    }

    pub fn with_max_isolated_fraction(mut self, fraction: F) -> Self {
        self.max_isolated_fraction = fraction;
        self
    }

    /// Rejects out-of-range values and parameter combinations that could only
    /// produce an empty or meaningless network.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.sampling_sweeps == 0 {
            return Err(ConfigurationError::out_of_range("sampling_sweeps", "> 0", 0));
        }
        if self.chains == 0 {
            return Err(ConfigurationError::out_of_range("chains", "> 0", 0));
        }
        if self.workers == 0 {
            return Err(ConfigurationError::out_of_range("workers", "> 0", 0));
        }
        if self.thinning == 0 {
            return Err(ConfigurationError::out_of_range("thinning", ">= 1", 0));
        }
        if self.thinning > self.sampling_sweeps {
            return Err(ConfigurationError::Contradiction(format!(
                "thinning {} exceeds sampling_sweeps {}: no sweep would ever be recorded",
                self.thinning, self.sampling_sweeps
            )));
        }
        if let Some(secs) = self.time_limit_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(ConfigurationError::out_of_range("time_limit_secs", "finite and > 0", secs));
            }
        }
        if self.min_calibration_samples == 0 {
            return Err(ConfigurationError::out_of_range("min_calibration_samples", ">= 1", 0));
        }
        if !(self.min_overlap.is_finite() && self.min_overlap >= 0.0) {
            return Err(ConfigurationError::out_of_range("min_overlap", "finite and >= 0", self.min_overlap));
        }
        if !self.dummy_score.is_finite() {
            return Err(ConfigurationError::out_of_range("dummy_score", "finite", self.dummy_score));
        }
        if self.max_candidates == Some(0) {
            return Err(ConfigurationError::out_of_range("max_candidates", "> 0", 0));
        }
        if !(self.corroboration_bonus.is_finite() && self.corroboration_bonus >= 0.0) {
            return Err(ConfigurationError::out_of_range(
                "corroboration_bonus",
                "finite and >= 0",
                self.corroboration_bonus,
            ));
        }
        check_fraction("min_similarity", self.min_similarity)?;
        if !(self.cluster_ppm.is_finite() && self.cluster_ppm >= 0.0) {
            return Err(ConfigurationError::out_of_range("cluster_ppm", "finite and >= 0", self.cluster_ppm));
        }
        if !(self.cluster_abs_mass.is_finite() && self.cluster_abs_mass >= 0.0) {
            return Err(ConfigurationError::out_of_range(
                "cluster_abs_mass",
                "finite and >= 0",
                self.cluster_abs_mass,
            ));
        }
        check_fraction("max_isolated_fraction", self.max_isolated_fraction)?;
        check_fraction("badly_connected_fraction", self.badly_connected_fraction)?;

        match self.edge_filter {
            EdgeFilterPolicy::GlobalThreshold { p } => {
                check_fraction("edge_filter.p", p)?;
                if p >= 1.0 && self.max_isolated_fraction < 1.0 {
                    return Err(ConfigurationError::Contradiction(
                        "global threshold p = 1 removes every edge, but max_isolated_fraction < 1 requires connected compounds".into(),
                    ));
                }
            }
            EdgeFilterPolicy::LocalTopK { k } => {
                if k == 0 {
                    return Err(ConfigurationError::out_of_range("edge_filter.k", "> 0", 0));
                }
            }
            EdgeFilterPolicy::Combined { p, k, min_local } => {
                check_fraction("edge_filter.p", p)?;
                if k == 0 {
                    return Err(ConfigurationError::out_of_range("edge_filter.k", "> 0", 0));
                }
                if min_local > k {
                    return Err(ConfigurationError::Contradiction(format!(
                        "min_local {} exceeds k {}: force-adding k neighbors can never reach min_local",
                        min_local, k
                    )));
                }
            }
            EdgeFilterPolicy::None => {}
        }
        Ok(())
    }
}
