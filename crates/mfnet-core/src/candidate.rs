use crate::F;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Molecular formula identity, e.g. `C6H12O6`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Formula(pub String);

/// Ion type / adduct the formula was computed for, e.g. `[M+H]+`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IonType(pub String);

impl Formula {
    pub fn new(s: impl Into<String>) -> Self {
        Formula(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl IonType {
    pub fn new(s: impl Into<String>) -> Self {
        IonType(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for IonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const DUMMY_FORMULA: &str = "UNEXPLAINED";
pub const DUMMY_ION_TYPE: &str = "[M+?]";

/// Candidate as delivered by the upstream tree scorer, before validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawCandidate {
    pub formula: Formula,
    pub ion_type: IonType,
    #[serde(default)]
    pub score: Option<F>,
    #[serde(default)]
    pub fragments: Vec<Formula>,
    #[serde(default)]
    pub losses: Vec<Formula>,
}

impl RawCandidate {
    pub fn new(formula: &str, ion_type: &str, score: F) -> Self {
        Self {
            formula: Formula::new(formula),
            ion_type: IonType::new(ion_type),
            score: Some(score),
            fragments: Vec::new(),
            losses: Vec::new(),
        }
    }

    pub fn with_fragments(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|f| Formula::new(*f)).collect();
        self
    }

    pub fn with_losses(mut self, losses: &[&str]) -> Self {
        self.losses = losses.iter().map(|f| Formula::new(*f)).collect();
        self
    }
}

/// One possible formula assignment for a compound.
///
/// `fragments` and `losses` are kept sorted so multiset intersections can be
/// counted with a single merge pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub formula: Formula,
    pub ion_type: IonType,
    pub base_score: F,
    pub fragments: Vec<Formula>,
    pub losses: Vec<Formula>,
    pub is_dummy: bool,
    pub is_corroborated: bool,
}

impl Candidate {
    pub fn new(formula: Formula, ion_type: IonType, base_score: F) -> Self {
        Self {
            formula,
            ion_type,
            base_score,
            fragments: Vec::new(),
            losses: Vec::new(),
            is_dummy: false,
            is_corroborated: false,
        }
    }

    /// Synthetic "no good explanation" candidate.
    pub fn dummy(score: F) -> Self {
        Self {
            formula: Formula::new(DUMMY_FORMULA),
            ion_type: IonType::new(DUMMY_ION_TYPE),
            base_score: score,
            fragments: Vec::new(),
            losses: Vec::new(),
            is_dummy: true,
            is_corroborated: false,
        }
    }

    pub fn with_fragments(mut self, mut fragments: Vec<Formula>) -> Self {
        fragments.sort();
        self.fragments = fragments;
        self
    }

    pub fn with_losses(mut self, mut losses: Vec<Formula>) -> Self {
        losses.sort();
        self.losses = losses;
        self
    }

    /// Number of explained peaks in the underlying fragmentation tree.
    pub fn tree_size(&self) -> usize {
        self.fragments.len()
    }
}

/// A measured compound and its candidate list. After the store is built the
/// list always ends with exactly one dummy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub id: String,
    pub candidates: Vec<Candidate>,
}

impl Compound {
    pub fn new(id: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            id: id.into(),
            candidates,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn dummy_index(&self) -> Option<usize> {
        self.candidates.iter().position(|c| c.is_dummy)
    }

    /// Index of the highest base score; ties go to the lower index.
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, F)> = None;
        for (idx, c) in self.candidates.iter().enumerate() {
            match best {
                Some((_, score)) if c.base_score <= score => {}
                _ => best = Some((idx, c.base_score)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}
