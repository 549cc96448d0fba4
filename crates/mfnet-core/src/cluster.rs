use crate::candidate::{Candidate, Compound, Formula};
use crate::F;
use std::collections::HashSet;
use tracing::debug;

/// Only the first few candidates of each compound are compared.
const TOP_CANDIDATES: usize = 5;
const MIN_SHARED_FRAGMENTS: usize = 3;
const MIN_SHARED_FRACTION: F = 0.75;

/// Precursor mass tolerance used to decide whether two compounds may be the
/// same molecule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassWindow {
    pub ppm: F,
    pub abs: F,
}

impl MassWindow {
    pub fn new(ppm: F, abs: F) -> Self {
        Self { ppm, abs }
    }

    /// `|center - mass|` within `max(ppm * center, abs)`.
    pub fn contains(&self, center: F, mass: F) -> bool {
        let tolerance = (center * self.ppm * 1e-6).max(self.abs);
        (center - mass).abs() <= tolerance
    }
}

impl Default for MassWindow {
    fn default() -> Self {
        Self::new(10.0, 0.005)
    }
}

/// Groups compounds that look like repeated measurements of one molecule.
///
/// Returns one group per output compound, representative first and the
/// remaining members in input order. Representatives are the member with the
/// highest top base score; groups are ordered by their representative's index.
/// Compounds without a precursor mass or without candidates stay on their own.
pub fn cluster_compounds(compounds: &[Compound], masses: &[Option<F>], window: &MassWindow) -> Vec<Vec<usize>> {
    // richest trees first, so they seed the clusters
    let mut keys: Vec<usize> = (0..compounds.len()).collect();
    keys.sort_by_key(|&c| std::cmp::Reverse(top_tree_size(&compounds[c])));

    let mut clustered = vec![false; compounds.len()];
    let mut groups = Vec::new();

    for (i, &left) in keys.iter().enumerate() {
        if clustered[left] {
            continue;
        }
        clustered[left] = true;
        let mut group = vec![left];

        if let Some(left_mass) = masses.get(left).copied().flatten() {
            for &right in &keys[i + 1..] {
                if clustered[right] {
                    continue;
                }
                let Some(right_mass) = masses.get(right).copied().flatten() else {
                    continue;
                };
                if !window.contains(left_mass, right_mass) {
                    continue;
                }
                if let Some(shared) = shared_explanation(&compounds[left], &compounds[right]) {
                    debug!(
                        left = %compounds[left].id,
                        right = %compounds[right].id,
                        shared,
                        "clustering compounds"
                    );
                    clustered[right] = true;
                    group.push(right);
                }
            }
        }

        group.sort_unstable();
        let rep = representative(compounds, &group);
        group.retain(|&c| c != rep);
        group.insert(0, rep);
        groups.push(group);
    }

    groups.sort_by_key(|g| g[0]);
    groups
}

fn top_tree_size(compound: &Compound) -> usize {
    compound.candidates.first().map_or(0, Candidate::tree_size)
}

fn representative(compounds: &[Compound], group: &[usize]) -> usize {
    let top_score = |c: usize| compounds[c].candidates.first().map_or(F::NEG_INFINITY, |x| x.base_score);
    let mut best = group[0];
    for &c in &group[1..] {
        if top_score(c) > top_score(best) {
            best = c;
        }
    }
    best
}

/// Fragment count shared by the first matching pair of top candidates with
/// the same formula, if that pair is similar enough to merge.
fn shared_explanation(left: &Compound, right: &Compound) -> Option<usize> {
    for l in left.candidates.iter().take(TOP_CANDIDATES) {
        for r in right.candidates.iter().take(TOP_CANDIDATES) {
            if l.formula != r.formula {
                continue;
            }
            let fragments: HashSet<&Formula> = l.fragments.iter().collect();
            let common = r.fragments.iter().filter(|f| fragments.contains(f)).count();
            let smaller = l.tree_size().min(r.tree_size());
            if common >= MIN_SHARED_FRAGMENTS && common as F >= (MIN_SHARED_FRACTION * smaller as F).floor() {
                return Some(common);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::IonType;

    fn compound(id: &str, top: (&str, F, &[&str])) -> Compound {
        let (formula, score, fragments) = top;
        let fragments = fragments.iter().map(|f| Formula::new(*f)).collect();
        Compound::new(
            id,
            vec![
                Candidate::new(Formula::new(formula), IonType::new("[M+H]+"), score).with_fragments(fragments),
                Candidate::new(Formula::new(format!("{}-alt", id)), IonType::new("[M+H]+"), score - 1.0),
            ],
        )
    }

    const TREE: &[&str] = &["C2H4", "CH2O", "C3H6", "C4H8"];

    #[test]
    fn test_mass_window() {
        let window = MassWindow::new(10.0, 0.005);
        // 10 ppm of 1000 Da is 0.01
        assert!(window.contains(1000.0, 1000.009));
        assert!(!window.contains(1000.0, 1000.02));
        // absolute floor at low mass
        assert!(window.contains(100.0, 100.004));
        assert!(!window.contains(100.0, 100.006));
    }

    #[test]
    fn test_duplicates_merge_into_best_scoring() {
        let compounds = vec![
            compound("a", ("C6H12O6", 1.0, TREE)),
            compound("b", ("C6H12O6", 3.0, TREE)),
            compound("c", ("C6H12O6", 2.0, TREE)),
        ];
        let masses = vec![Some(181.07), Some(181.071), Some(181.072)];
        let groups = cluster_compounds(&compounds, &masses, &MassWindow::default());
        assert_eq!(groups, vec![vec![1, 0, 2]]);
    }

    #[test]
    fn test_mass_outside_window_stays_apart() {
        let compounds = vec![compound("a", ("C6H12O6", 1.0, TREE)), compound("b", ("C6H12O6", 1.0, TREE))];
        let masses = vec![Some(181.07), Some(181.2)];
        let groups = cluster_compounds(&compounds, &masses, &MassWindow::default());
        assert_eq!(groups, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_missing_mass_never_clusters() {
        let compounds = vec![compound("a", ("C6H12O6", 1.0, TREE)), compound("b", ("C6H12O6", 1.0, TREE))];
        let groups = cluster_compounds(&compounds, &[Some(181.07), None], &MassWindow::default());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_needs_three_and_three_quarters_of_fragments() {
        let masses = vec![Some(181.07), Some(181.07)];
        // 2 shared fragments is below the absolute minimum
        let two = vec![
            compound("a", ("C6H12O6", 1.0, &["C2H4", "CH2O"])),
            compound("b", ("C6H12O6", 1.0, &["C2H4", "CH2O"])),
        ];
        assert_eq!(cluster_compounds(&two, &masses, &MassWindow::default()).len(), 2);

        // 3 of a 5-fragment tree: floor(0.75 * 5) = 3
        let enough = vec![
            compound("a", ("C6H12O6", 1.0, &["C2H4", "CH2O", "C3H6", "N", "O"])),
            compound("b", ("C6H12O6", 1.0, &["C2H4", "CH2O", "C3H6", "P", "S", "Cl"])),
        ];
        assert_eq!(cluster_compounds(&enough, &masses, &MassWindow::default()).len(), 1);

        // 3 of an 8-fragment tree: floor(0.75 * 8) = 6
        let sparse = vec![
            compound("a", ("C6H12O6", 1.0, &["C2H4", "CH2O", "C3H6", "N", "O", "P", "S", "Cl"])),
            compound("b", ("C6H12O6", 1.0, &["C2H4", "CH2O", "C3H6", "Br", "I", "F", "Si", "B"])),
        ];
        assert_eq!(cluster_compounds(&sparse, &masses, &MassWindow::default()).len(), 2);
    }

    #[test]
    fn test_formula_must_match_among_top_candidates() {
        let compounds = vec![compound("a", ("C6H12O6", 1.0, TREE)), compound("b", ("C7H16O5", 1.0, TREE))];
        let groups = cluster_compounds(&compounds, &[Some(181.07), Some(181.07)], &MassWindow::default());
        assert_eq!(groups.len(), 2);
    }
}
