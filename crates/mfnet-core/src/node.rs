use crate::candidate::Candidate;
use crate::F;

/// Log-weight of a candidate on its own, before any network evidence.
pub trait NodeScorer: Send + Sync {
    fn score(&self, candidate: &Candidate) -> F;
}

/// Base score plus a fixed bonus for library-corroborated formulas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StandardNodeScorer {
    pub corroboration_bonus: F,
}

impl Default for StandardNodeScorer {
    fn default() -> Self {
        Self {
            corroboration_bonus: 0.0,
        }
    }
}

impl StandardNodeScorer {
    pub fn new(corroboration_bonus: F) -> Self {
        Self { corroboration_bonus }
    }
}

impl NodeScorer for StandardNodeScorer {
    fn score(&self, candidate: &Candidate) -> F {
        if candidate.is_corroborated {
            candidate.base_score + self.corroboration_bonus
        } else {
            candidate.base_score
        }
    }
}

pub fn log_sum_exp(logits: &[F]) -> F {
    let max = logits.iter().copied().fold(F::NEG_INFINITY, F::max);
    if !max.is_finite() {
        return max;
    }
    max + logits.iter().map(|l| (l - max).exp()).sum::<F>().ln()
}

/// Normalized `exp(logits)`; an empty slice yields an empty vector.
pub fn softmax(logits: &[F]) -> Vec<F> {
    if logits.is_empty() {
        return Vec::new();
    }
    let lse = log_sum_exp(logits);
    if !lse.is_finite() {
        let uniform = 1.0 / logits.len() as F;
        return vec![uniform; logits.len()];
    }
    logits.iter().map(|l| (l - lse).exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Formula, IonType};
    use approx::assert_relative_eq;

    #[test]
    fn test_bonus_only_when_corroborated() {
        let scorer = StandardNodeScorer::new(2.0);
        let mut c = Candidate::new(Formula::new("C2H6O"), IonType::new("[M+H]+"), 1.5);
        assert_eq!(scorer.score(&c), 1.5);
        c.is_corroborated = true;
        assert_eq!(scorer.score(&c), 3.5);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 0.0, -1.0, -10.0]);
        assert_relative_eq!(p.iter().sum::<F>(), 1.0, epsilon = 1e-12);
        assert!(p[0] > p[1] && p[1] > p[2] && p[2] > p[3]);
    }

    #[test]
    fn test_softmax_shift_invariant() {
        let a = softmax(&[0.0, 1.0]);
        let b = softmax(&[700.0, 701.0]);
        assert_relative_eq!(a[1], b[1], epsilon = 1e-12);
    }
}
