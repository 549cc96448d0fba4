//! Spectral-library evidence.
//!
//! The library search and the adduct / mass-difference reasoning live outside
//! this crate. All the network sees is a boolean per candidate, set here once
//! before the graph is built.

use crate::candidate::{Candidate, Formula, IonType};
use crate::F;
use serde::{Deserialize, Serialize};

/// Best library match reported for a compound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LibraryHit {
    pub formula: Formula,
    #[serde(default)]
    pub ion_type: Option<IonType>,
    pub shared_peaks: usize,
    pub similarity: F,
}

/// Minimum evidence for a library hit to count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub min_shared_peaks: usize,
    pub min_similarity: F,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            min_shared_peaks: 5,
            min_similarity: 0.0,
        }
    }
}

impl TrustPolicy {
    pub fn trusts(&self, hit: &LibraryHit) -> bool {
        hit.shared_peaks >= self.min_shared_peaks && hit.similarity >= self.min_similarity
    }
}

/// Decides whether a candidate formula agrees with a library hit, e.g. equal
/// formula or a known adduct / biotransformation difference.
pub trait FormulaCompatibility: Send + Sync {
    fn is_compatible(&self, candidate: &Candidate, hit: &LibraryHit) -> bool;
}

/// Same formula, and same ion type if the hit names one.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactFormula;

impl FormulaCompatibility for ExactFormula {
    fn is_compatible(&self, candidate: &Candidate, hit: &LibraryHit) -> bool {
        candidate.formula == hit.formula
            && hit
                .ion_type
                .as_ref()
                .map_or(true, |ion| *ion == candidate.ion_type)
    }
}

impl<Fun> FormulaCompatibility for Fun
where
    Fun: Fn(&Candidate, &LibraryHit) -> bool + Send + Sync,
{
    fn is_compatible(&self, candidate: &Candidate, hit: &LibraryHit) -> bool {
        self(candidate, hit)
    }
}

/// Flags every non-dummy candidate that a trusted hit corroborates. Returns the
/// number of flagged candidates.
pub fn mark_corroborated<C: FormulaCompatibility + ?Sized>(
    candidates: &mut [Candidate],
    hit: &LibraryHit,
    policy: &TrustPolicy,
    compat: &C,
) -> usize {
    if !policy.trusts(hit) {
        return 0;
    }
    let mut marked = 0;
    for candidate in candidates.iter_mut().filter(|c| !c.is_dummy) {
        if compat.is_compatible(candidate, hit) {
            candidate.is_corroborated = true;
            marked += 1;
        }
    }
    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new(Formula::new("C6H12O6"), IonType::new("[M+H]+"), 1.0),
            Candidate::new(Formula::new("C6H12O6"), IonType::new("[M+Na]+"), 0.5),
            Candidate::new(Formula::new("C7H8O"), IonType::new("[M+H]+"), 0.2),
            Candidate::dummy(-10.0),
        ]
    }

    fn hit(shared_peaks: usize) -> LibraryHit {
        LibraryHit {
            formula: Formula::new("C6H12O6"),
            ion_type: Some(IonType::new("[M+H]+")),
            shared_peaks,
            similarity: 0.8,
        }
    }

    #[test]
    fn test_untrusted_hit_marks_nothing() {
        let mut cands = candidates();
        let n = mark_corroborated(&mut cands, &hit(4), &TrustPolicy::default(), &ExactFormula);
        assert_eq!(n, 0);
        assert!(cands.iter().all(|c| !c.is_corroborated));
    }

    #[test]
    fn test_exact_formula_respects_ion_type() {
        let mut cands = candidates();
        let n = mark_corroborated(&mut cands, &hit(6), &TrustPolicy::default(), &ExactFormula);
        assert_eq!(n, 1);
        assert!(cands[0].is_corroborated);
        assert!(!cands[1].is_corroborated);
    }

    #[test]
    fn test_closure_compatibility() {
        let mut cands = candidates();
        let any_ion = |c: &Candidate, h: &LibraryHit| c.formula == h.formula;
        let n = mark_corroborated(&mut cands, &hit(6), &TrustPolicy::default(), &any_ion);
        assert_eq!(n, 2);
        assert!(!cands[3].is_corroborated);
    }
}
