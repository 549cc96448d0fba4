use crate::candidate::{Candidate, Compound, RawCandidate};
use crate::cluster::{cluster_compounds, MassWindow};
use crate::config::NetworkConfig;
use crate::corroboration::{mark_corroborated, ExactFormula, FormulaCompatibility, LibraryHit, TrustPolicy};
use crate::error::DataError;
use crate::F;
use tracing::{debug, info, warn};

/// What happened to the input while the store was assembled.
#[derive(Clone, Debug, Default)]
pub struct StoreReport {
    pub dropped: Vec<DataError>,
    pub truncated: usize,
    pub corroborated: usize,
    /// Compounds merged into another compound's cluster.
    pub clustered: usize,
}

/// Per-compound candidate lists, each closed by exactly one dummy candidate.
///
/// Built once through [`StoreBuilder`] and read-only afterwards.
#[derive(Clone, Debug)]
pub struct CandidateStore {
    compounds: Vec<Compound>,
    /// Input ids each compound stands for, its own id first.
    members: Vec<Vec<String>>,
    report: StoreReport,
}

impl CandidateStore {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    pub fn compound(&self, idx: usize) -> &Compound {
        &self.compounds[idx]
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn total_candidates(&self) -> usize {
        self.compounds.iter().map(|c| c.len()).sum()
    }

    pub fn report(&self) -> &StoreReport {
        &self.report
    }

    /// Ids of every input compound merged into `idx`, starting with its own.
    pub fn members(&self, idx: usize) -> &[String] {
        &self.members[idx]
    }
}

/// Collects raw candidates, drops malformed ones and appends the dummies.
pub struct StoreBuilder {
    dummy_score: F,
    max_candidates: Option<usize>,
    trust: TrustPolicy,
    clustering: Option<MassWindow>,
    compounds: Vec<Compound>,
    hits: Vec<Option<LibraryHit>>,
    masses: Vec<Option<F>>,
    report: StoreReport,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self {
            dummy_score: -10.0,
            max_candidates: None,
            trust: TrustPolicy::default(),
            clustering: None,
            compounds: Vec::new(),
            hits: Vec::new(),
            masses: Vec::new(),
            report: StoreReport::default(),
        }
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        let builder = Self::default()
            .with_dummy_score(config.dummy_score)
            .with_max_candidates(config.max_candidates)
            .with_trust_policy(TrustPolicy {
                min_shared_peaks: config.min_shared_peaks,
                min_similarity: config.min_similarity,
            });
        if config.cluster_compounds {
            builder.with_clustering(MassWindow::new(config.cluster_ppm, config.cluster_abs_mass))
        } else {
            builder
        }
    }

    pub fn with_dummy_score(mut self, score: F) -> Self {
        self.dummy_score = score;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: Option<usize>) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_trust_policy(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    /// Merges near-duplicate compounds within `window` at build time.
    pub fn with_clustering(mut self, window: MassWindow) -> Self {
        self.clustering = Some(window);
        self
    }

    /// Adds a compound and returns its index.
    ///
    /// Candidates without a finite score are dropped with a warning. The rest
    /// are ordered by descending base score (stable) and truncated to
    /// `max_candidates` if set.
    pub fn add_compound(&mut self, id: impl Into<String>, raws: Vec<RawCandidate>) -> usize {
        let id = id.into();
        let mut candidates = Vec::with_capacity(raws.len() + 1);

        for raw in raws {
            let score = match raw.score {
                Some(s) if s.is_finite() => s,
                Some(s) => {
                    self.drop_candidate(DataError::NonFiniteScore {
                        compound: id.clone(),
                        formula: raw.formula.to_string(),
                        score: s,
                    });
                    continue;
                }
                None => {
                    self.drop_candidate(DataError::MissingScore {
                        compound: id.clone(),
                        formula: raw.formula.to_string(),
                    });
                    continue;
                }
            };
            candidates.push(
                Candidate::new(raw.formula, raw.ion_type, score)
                    .with_fragments(raw.fragments)
                    .with_losses(raw.losses),
            );
        }

        candidates.sort_by(|a: &Candidate, b: &Candidate| b.base_score.total_cmp(&a.base_score));
        if let Some(max) = self.max_candidates {
            if candidates.len() > max {
                let cut = candidates.len() - max;
                debug!(compound = %id, cut, "truncating candidate list");
                candidates.truncate(max);
                self.report.truncated += cut;
            }
        }

        self.compounds.push(Compound::new(id, candidates));
        self.hits.push(None);
        self.masses.push(None);
        self.compounds.len() - 1
    }

    pub fn add_library_hit(&mut self, compound: usize, hit: LibraryHit) {
        match self.hits.get_mut(compound) {
            Some(slot) => *slot = Some(hit),
            None => warn!(
                compound,
                compounds = self.compounds.len(),
                formula = %hit.formula,
                "no compound found for library hit, ignoring"
            ),
        }
    }

    /// Measured precursor ion mass, used only for clustering.
    pub fn set_precursor_mass(&mut self, compound: usize, mass: F) {
        match self.masses.get_mut(compound) {
            Some(slot) => *slot = Some(mass),
            None => warn!(compound, compounds = self.compounds.len(), "no compound found for precursor mass, ignoring"),
        }
    }

    fn drop_candidate(&mut self, err: DataError) {
        warn!("dropping candidate: {}", err);
        self.report.dropped.push(err);
    }

    /// Finishes the store with exact-formula library corroboration.
    pub fn build(self) -> CandidateStore {
        self.build_with(&ExactFormula)
    }

    pub fn build_with<C: FormulaCompatibility + ?Sized>(mut self, compat: &C) -> CandidateStore {
        let members = match self.clustering {
            Some(window) => self.merge_clusters(&window),
            None => self.compounds.iter().map(|c| vec![c.id.clone()]).collect(),
        };

        for (compound, hit) in self.compounds.iter_mut().zip(self.hits.iter()) {
            if let Some(hit) = hit {
                self.report.corroborated +=
                    mark_corroborated(&mut compound.candidates, hit, &self.trust, compat);
            }
            compound.candidates.push(Candidate::dummy(self.dummy_score));
        }

        if !self.report.dropped.is_empty() {
            warn!(
                dropped = self.report.dropped.len(),
                "malformed candidates were removed from the input"
            );
        }

        CandidateStore {
            compounds: self.compounds,
            members,
            report: self.report,
        }
    }

    /// Keeps one representative per cluster. The representative takes the
    /// most similar library hit found among its members.
    fn merge_clusters(&mut self, window: &MassWindow) -> Vec<Vec<String>> {
        let groups = cluster_compounds(&self.compounds, &self.masses, window);
        let before = self.compounds.len();

        let mut compounds = std::mem::take(&mut self.compounds)
            .into_iter()
            .map(Some)
            .collect::<Vec<_>>();
        let mut hits = std::mem::take(&mut self.hits);
        let mut kept = Vec::with_capacity(groups.len());
        let mut kept_hits = Vec::with_capacity(groups.len());
        let mut members = Vec::with_capacity(groups.len());

        for group in &groups {
            let best_hit = group
                .iter()
                .filter_map(|&c| hits[c].take())
                .max_by(|a, b| a.similarity.total_cmp(&b.similarity));
            members.push(group.iter().filter_map(|&c| compounds[c].as_ref().map(|x| x.id.clone())).collect());
            if let Some(rep) = compounds[group[0]].take() {
                kept.push(rep);
                kept_hits.push(best_hit);
            }
        }

        self.compounds = kept;
        self.hits = kept_hits;
        self.masses.clear();
        self.report.clustered = before - self.compounds.len();
        info!(
            compounds = before,
            clusters = self.compounds.len(),
            "clustered near-duplicate compounds"
        );
        members
    }
}
