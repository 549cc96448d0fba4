//! Turns raw edge scores into weights that approximate "probability this
//! score is not random", by fitting a one-parameter family to the observed
//! score population with median-based estimators.

use crate::edge_score::Edge;
use mfnet_core::{CalibrationFamily, NetworkConfig, WeightMapping, F};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Upper bound for [`WeightMapping::Survival`] weights.
pub const SURVIVAL_CAP: F = 50.0;

/// Consistency constant turning a median absolute deviation into a normal sigma.
const MAD_TO_SIGMA: F = 1.4826;

/// A fitted raw-score distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Calibration {
    Exponential { lambda: F },
    LogNormal { mu: F, sigma: F },
    /// Weight equals raw score.
    Identity,
}

impl Calibration {
    /// CDF of the fitted distribution at `x`.
    pub fn cdf(&self, x: F) -> F {
        match *self {
            Calibration::Exponential { lambda } => {
                if x <= 0.0 {
                    0.0
                } else {
                    -(-lambda * x).exp_m1()
                }
            }
            Calibration::LogNormal { mu, sigma } => {
                if x <= 0.0 {
                    0.0
                } else {
                    normal_cdf((x.ln() - mu) / sigma).clamp(0.0, 1.0)
                }
            }
            Calibration::Identity => x,
        }
    }

    pub fn weight(&self, raw: F, mapping: WeightMapping) -> F {
        if let Calibration::Identity = self {
            return raw.max(0.0);
        }
        let p = self.cdf(raw);
        match mapping {
            WeightMapping::Probability => p,
            WeightMapping::Survival => (-(-p).ln_1p()).min(SURVIVAL_CAP),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ScoreCalibrator {
    family: CalibrationFamily,
    mapping: WeightMapping,
    min_samples: usize,
}

impl Default for ScoreCalibrator {
    fn default() -> Self {
        Self {
            family: CalibrationFamily::Exponential,
            mapping: WeightMapping::Probability,
            min_samples: 10,
        }
    }
}

impl ScoreCalibrator {
    pub fn new(family: CalibrationFamily, mapping: WeightMapping, min_samples: usize) -> Self {
        Self {
            family,
            mapping,
            min_samples,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(
            config.calibration,
            config.weight_mapping,
            config.min_calibration_samples,
        )
    }

    /// Fits the configured family to the strictly positive scores in `raw`.
    ///
    /// Falls back to [`Calibration::Identity`] with a warning when there are
    /// too few samples or the fit degenerates.
    pub fn fit(&self, raw: &[F]) -> Calibration {
        let mut positive: Vec<F> = raw.iter().copied().filter(|x| *x > 0.0 && x.is_finite()).collect();
        if positive.len() < self.min_samples {
            warn!(
                samples = positive.len(),
                required = self.min_samples,
                "too few edge scores to calibrate, using raw scores as weights"
            );
            return Calibration::Identity;
        }

        let fitted = match self.family {
            CalibrationFamily::Exponential => {
                median(&mut positive).and_then(|m| {
                    (m > 0.0).then(|| Calibration::Exponential {
                        lambda: std::f64::consts::LN_2 / m,
                    })
                })
            }
            CalibrationFamily::LogNormal => {
                let mut logs: Vec<F> = positive.iter().map(|x| x.ln()).collect();
                median(&mut logs).and_then(|mu| {
                    let mut deviations: Vec<F> = logs.iter().map(|l| (l - mu).abs()).collect();
                    let sigma = median(&mut deviations)? * MAD_TO_SIGMA;
                    (sigma > 0.0 && sigma.is_finite()).then_some(Calibration::LogNormal { mu, sigma })
                })
            }
        };

        match fitted {
            Some(calibration) => {
                info!(?calibration, samples = positive.len(), "fitted edge score distribution");
                calibration
            }
            None => {
                warn!(family = ?self.family, "degenerate edge score fit, using raw scores as weights");
                Calibration::Identity
            }
        }
    }

    /// Fits on the edges' raw scores and overwrites their weights.
    pub fn calibrate(&self, edges: &mut [Edge]) -> Calibration {
        let raw: Vec<F> = edges.iter().map(|e| e.raw_score).collect();
        let calibration = self.fit(&raw);
        for edge in edges.iter_mut() {
            edge.weight = calibration.weight(edge.raw_score, self.mapping);
        }
        calibration
    }
}

/// Median of `xs`, reordering the slice in place.
pub fn median(xs: &mut [F]) -> Option<F> {
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(|a, b| a.total_cmp(b));
    let mid = xs.len() / 2;
    if xs.len() % 2 == 0 {
        Some(0.5 * (xs[mid - 1] + xs[mid]))
    } else {
        Some(xs[mid])
    }
}

/// Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7.
pub fn erf(x: F) -> F {
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / 0.327_591_1_f64.mul_add(x, 1.0);
    let poly = 1.061_405_429_f64
        .mul_add(t, -1.453_152_027)
        .mul_add(t, 1.421_413_741)
        .mul_add(t, -0.284_496_736)
        .mul_add(t, 0.254_829_592);
    let y = (poly * t).mul_add(-(-x * x).exp(), 1.0);
    sign * y
}

pub fn normal_cdf(x: F) -> F {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}
