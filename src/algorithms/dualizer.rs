// src/algorithms/dualizer.rs

//! Hitting-set duality between AXp's and CXp's.
//!
//! Every AXp hits every CXp, and the minimal hitting sets of a complete CXp
//! family are exactly the AXp's. The dualizer owns the explanation store of
//! one run and proposes the next subset worth probing from it.

use crate::core::{Exactness, Explanation, ExplanationKind, FeatureSubset, FfaError, Result};
use std::collections::{HashSet, VecDeque};

/// Result of offering an explanation to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added,
    /// A stored member is a subset of the candidate; the candidate was dropped.
    Subsumed,
}

/// One minimal hitting set of `family`, avoiding `excluded`.
///
/// Walks the family in order and, whenever the working set misses a member,
/// adds that member's smallest feature outside `excluded`. A final deletion
/// pass (highest index first) removes features the set can do without.
/// Returns `None` when some member lies entirely inside `excluded`.
pub fn minimal_hitting_set(family: &[FeatureSubset], excluded: &FeatureSubset) -> Option<FeatureSubset> {
    let mut hitting = FeatureSubset::empty();
    for member in family {
        if !hitting.intersects(member) {
            let pick = member.iter().find(|f| !excluded.contains(*f))?;
            hitting.insert(pick);
        }
    }

    let picked: Vec<usize> = hitting.iter().rev().collect();
    for feature in picked {
        let trial = hitting.without(feature);
        if family.iter().all(|member| trial.intersects(member)) {
            hitting = trial;
        }
    }
    Some(hitting)
}

/// Up to `limit` distinct minimal hitting sets of `family` (all of them for `None`).
pub fn minimal_hitting_sets(family: &[FeatureSubset], limit: Option<usize>) -> Vec<FeatureSubset> {
    let sets = HittingSets::new(family);
    match limit {
        Some(limit) => sets.take(limit).collect(),
        None => sets.collect(),
    }
}

/// Lazy enumeration of the minimal hitting sets of a family.
///
/// Each found set `H` reseeds the search with `excluded ∪ {f}` for every
/// `f ∈ H`. Any other minimal hitting set avoids at least one such `f`, so
/// breadth-first expansion of the seeds reaches every minimal hitting set.
pub struct HittingSets<'f> {
    family: &'f [FeatureSubset],
    seeds: VecDeque<FeatureSubset>,
    seen_seeds: HashSet<FeatureSubset>,
    yielded: HashSet<FeatureSubset>,
}

impl<'f> HittingSets<'f> {
    pub fn new(family: &'f [FeatureSubset]) -> Self {
        let root = FeatureSubset::empty();
        HittingSets {
            family,
            seeds: VecDeque::from([root.clone()]),
            seen_seeds: HashSet::from([root]),
            yielded: HashSet::new(),
        }
    }
}

impl Iterator for HittingSets<'_> {
    type Item = FeatureSubset;

    fn next(&mut self) -> Option<FeatureSubset> {
        while let Some(excluded) = self.seeds.pop_front() {
            let Some(hitting) = minimal_hitting_set(self.family, &excluded) else {
                continue;
            };
            for feature in hitting.iter() {
                let seed = excluded.with(feature);
                if self.seen_seeds.insert(seed.clone()) {
                    self.seeds.push_back(seed);
                }
            }
            if self.yielded.insert(hitting.clone()) {
                return Some(hitting);
            }
        }
        None
    }
}

/// Explanation store of one enumeration run.
#[derive(Debug, Clone)]
pub struct HittingSetDualizer {
    num_features: usize,
    axps: Vec<Explanation>,
    cxps: Vec<Explanation>,
    /// Hitting-set guesses whose query settled nothing. Neither they nor
    /// their supersets are proposed again.
    discarded: HashSet<FeatureSubset>,
}

impl HittingSetDualizer {
    pub fn new(num_features: usize) -> Self {
        HittingSetDualizer {
            num_features,
            axps: Vec::new(),
            cxps: Vec::new(),
            discarded: HashSet::new(),
        }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn axps(&self) -> &[Explanation] {
        &self.axps
    }

    pub fn cxps(&self) -> &[Explanation] {
        &self.cxps
    }

    pub fn axp_family(&self) -> Vec<FeatureSubset> {
        self.axps.iter().map(|e| e.features.clone()).collect()
    }

    pub fn cxp_family(&self) -> Vec<FeatureSubset> {
        self.cxps.iter().map(|e| e.features.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.axps.is_empty() && self.cxps.is_empty()
    }

    pub fn discarded_count(&self) -> usize {
        self.discarded.len()
    }

    /// Forget everything, e.g. before explaining a new instance.
    pub fn reset(&mut self) {
        self.axps.clear();
        self.cxps.clear();
        self.discarded.clear();
    }

    pub fn add_cxp(&mut self, features: FeatureSubset, exactness: Exactness) -> Result<Insertion> {
        self.insert(ExplanationKind::Contrastive, features, exactness)
    }

    pub fn add_axp(&mut self, features: FeatureSubset, exactness: Exactness) -> Result<Insertion> {
        self.insert(ExplanationKind::Abductive, features, exactness)
    }

    pub fn add(&mut self, kind: ExplanationKind, features: FeatureSubset, exactness: Exactness) -> Result<Insertion> {
        self.insert(kind, features, exactness)
    }

    /// Record a hitting-set guess whose query was inconclusive.
    pub fn discard(&mut self, guess: FeatureSubset) {
        self.discarded.insert(guess);
    }

    /// The stored explanation that `features` would contradict as a new
    /// explanation of `kind`: a same-kind strict superset, or an
    /// opposite-kind member disjoint from it.
    pub fn duality_conflict(&self, features: &FeatureSubset, kind: ExplanationKind) -> Option<&Explanation> {
        self.family(kind)
            .iter()
            .find(|e| features.is_strict_subset(&e.features))
            .or_else(|| self.family(kind.dual()).iter().find(|e| !features.intersects(&e.features)))
    }

    /// A guess is blocked once it contains a discarded guess or a stored AXp.
    ///
    /// Shrinking a superset of a discarded guess walks back into the query
    /// that failed, so supersets are dropped along with the guess itself.
    pub fn is_blocked(&self, guess: &FeatureSubset) -> bool {
        self.discarded.iter().any(|d| d.is_subset(guess)) || self.axps.iter().any(|a| a.features.is_subset(guess))
    }

    /// Next candidate, in the free-set role, or `None` once the space is covered.
    ///
    /// The candidate is the complement of the first unblocked minimal hitting
    /// set of the CXp family. Every hitting set contains a minimal one and
    /// blocking is upward closed, so once all minimal hitting sets are
    /// blocked no hitting set is left to try.
    pub fn next_unexplained_subset(&self) -> Option<FeatureSubset> {
        let family = self.cxp_family();
        let guess = HittingSets::new(&family).find(|h| !self.is_blocked(h))?;
        Some(guess.complement(self.num_features))
    }

    fn family(&self, kind: ExplanationKind) -> &[Explanation] {
        match kind {
            ExplanationKind::Abductive => &self.axps,
            ExplanationKind::Contrastive => &self.cxps,
        }
    }

    fn insert(&mut self, kind: ExplanationKind, features: FeatureSubset, exactness: Exactness) -> Result<Insertion> {
        if let Some(max) = features.max_feature() {
            if max >= self.num_features {
                return Err(FfaError::InvalidInput(format!(
                    "Feature {} is out of range for {} features.",
                    max, self.num_features
                )));
            }
        }
        if self.family(kind).iter().any(|e| e.features.is_subset(&features)) {
            return Ok(Insertion::Subsumed);
        }
        if let Some(conflict) = self.duality_conflict(&features, kind) {
            let message = if conflict.kind == kind {
                format!("{:?} {} is a strict subset of stored {}", kind, features, conflict)
            } else {
                format!("{:?} {} does not intersect stored {}", kind, features, conflict)
            };
            return Err(FfaError::InvariantViolation {
                message,
                axps: self.axp_family(),
                cxps: self.cxp_family(),
            });
        }

        let explanation = Explanation { features, kind, exactness };
        match kind {
            ExplanationKind::Abductive => self.axps.push(explanation),
            ExplanationKind::Contrastive => self.cxps.push(explanation),
        }
        Ok(Insertion::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn family(sets: &[&[usize]]) -> Vec<FeatureSubset> {
        sets.iter().map(|s| s.iter().copied().collect()).collect()
    }

    fn hits_all(h: &FeatureSubset, family: &[FeatureSubset]) -> bool {
        family.iter().all(|m| h.intersects(m))
    }

    fn is_minimal_hitting_set(h: &FeatureSubset, family: &[FeatureSubset]) -> bool {
        hits_all(h, family) && h.iter().all(|f| !hits_all(&h.without(f), family))
    }

    /// Subsets of `0..n` by increasing size, lexicographic within a size.
    struct SubsetsBySize {
        n: usize,
        size: usize,
        indices: Option<Vec<usize>>,
    }
    
    impl SubsetsBySize {
        fn new(n: usize) -> Self {
            SubsetsBySize { n, size: 0, indices: Some(Vec::new()) }
        }
    }
    
    impl Iterator for SubsetsBySize {
        type Item = FeatureSubset;
    
        fn next(&mut self) -> Option<FeatureSubset> {
            let current = self.indices.take()?;
            let out: FeatureSubset = current.iter().copied().collect();
    
            // Advance to the next combination of `size`, or to the first of `size + 1`.
            let mut next = current;
            let k = next.len();
            let mut i = k;
            while i > 0 && next[i - 1] == self.n - k + i - 1 {
                i -= 1;
            }
            if i > 0 {
                next[i - 1] += 1;
                for j in i..k {
                    next[j] = next[j - 1] + 1;
                }
                self.indices = Some(next);
            } else if self.size < self.n {
                self.size += 1;
                self.indices = Some((0..self.size).collect());
            }
            Some(out)
        }
    }

    #[test]
    fn greedy_picks_smallest_index_then_minimises() {
        let cxps = family(&[&[0, 1], &[1, 2]]);
        let h = minimal_hitting_set(&cxps, &FeatureSubset::empty()).unwrap();
        // 0 hits the first member, 1 the second; 0 is then redundant.
        assert_eq!(h, FeatureSubset::singleton(1));
    }

    #[test]
    fn exclusions_steer_the_choice() {
        let cxps = family(&[&[0, 1], &[1, 2]]);
        let h = minimal_hitting_set(&cxps, &FeatureSubset::singleton(1)).unwrap();
        assert_eq!(h, FeatureSubset::from([0, 2]));
        assert!(minimal_hitting_set(&cxps, &FeatureSubset::from([0, 1])).is_none());
    }

    #[test]
    fn empty_family_is_hit_by_the_empty_set() {
        assert_eq!(minimal_hitting_sets(&[], None), vec![FeatureSubset::empty()]);
    }

    #[test]
    fn empty_member_cannot_be_hit() {
        let cxps = vec![FeatureSubset::empty()];
        assert!(minimal_hitting_sets(&cxps, None).is_empty());
    }

    #[test]
    fn enumerates_every_minimal_hitting_set() {
        let cxps = family(&[&[0, 1], &[2, 3]]);
        let mut all = minimal_hitting_sets(&cxps, None);
        all.sort();
        assert_eq!(all, family(&[&[0, 2], &[0, 3], &[1, 2], &[1, 3]]));
        assert_eq!(minimal_hitting_sets(&cxps, Some(2)).len(), 2);
    }

    #[test]
    fn subsets_by_size_covers_the_lattice_in_order() {
        let all: Vec<FeatureSubset> = SubsetsBySize::new(3).collect();
        assert_eq!(all.len(), 8);
        assert_eq!(all[0], FeatureSubset::empty());
        assert_eq!(all[1], FeatureSubset::singleton(0));
        assert_eq!(all[4], FeatureSubset::from([0, 1]));
        assert_eq!(all[7], FeatureSubset::full(3));
        assert_eq!(SubsetsBySize::new(0).count(), 1);
    }

    #[test]
    fn subsumed_candidates_are_not_stored() {
        let mut dualizer = HittingSetDualizer::new(3);
        assert_eq!(dualizer.add_cxp(FeatureSubset::singleton(0), Exactness::Exact).unwrap(), Insertion::Added);
        assert_eq!(
            dualizer.add_cxp(FeatureSubset::from([0, 2]), Exactness::Exact).unwrap(),
            Insertion::Subsumed
        );
        assert_eq!(dualizer.cxps().len(), 1);
    }

    #[test]
    fn strict_subset_of_stored_member_is_an_invariant_violation() {
        let mut dualizer = HittingSetDualizer::new(3);
        dualizer.add_axp(FeatureSubset::from([0, 1]), Exactness::Exact).unwrap();
        let err = dualizer.add_axp(FeatureSubset::singleton(0), Exactness::Exact).unwrap_err();
        assert!(matches!(err, FfaError::InvariantViolation { .. }));
    }

    #[test]
    fn disjoint_axp_and_cxp_is_an_invariant_violation() {
        let mut dualizer = HittingSetDualizer::new(3);
        dualizer.add_cxp(FeatureSubset::singleton(0), Exactness::Exact).unwrap();
        assert!(dualizer.duality_conflict(&FeatureSubset::singleton(1), ExplanationKind::Abductive).is_some());
        let err = dualizer.add_axp(FeatureSubset::singleton(1), Exactness::Exact).unwrap_err();
        match err {
            FfaError::InvariantViolation { cxps, .. } => assert_eq!(cxps, vec![FeatureSubset::singleton(0)]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn first_candidate_frees_every_feature() {
        let dualizer = HittingSetDualizer::new(3);
        assert_eq!(dualizer.next_unexplained_subset(), Some(FeatureSubset::full(3)));
    }

    #[test]
    fn candidates_disagree_with_the_hitting_set_guess() {
        let mut dualizer = HittingSetDualizer::new(3);
        dualizer.add_cxp(FeatureSubset::from([1, 2]), Exactness::Exact).unwrap();
        // Guess {1} is the first minimal hitting set; the candidate frees the rest.
        assert_eq!(dualizer.next_unexplained_subset(), Some(FeatureSubset::from([0, 2])));
        dualizer.add_axp(FeatureSubset::singleton(1), Exactness::Exact).unwrap();
        assert_eq!(dualizer.next_unexplained_subset(), Some(FeatureSubset::from([0, 1])));
        dualizer.add_axp(FeatureSubset::singleton(2), Exactness::Exact).unwrap();
        assert_eq!(dualizer.next_unexplained_subset(), None);
    }

    #[test]
    fn discarded_guesses_block_their_supersets() {
        let mut dualizer = HittingSetDualizer::new(3);
        dualizer.add_cxp(FeatureSubset::from([0, 1]), Exactness::Exact).unwrap();
        dualizer.discard(FeatureSubset::singleton(0));
        assert!(dualizer.is_blocked(&FeatureSubset::from([0, 1])));
        assert!(dualizer.is_blocked(&FeatureSubset::from([0, 2])));
        assert!(!dualizer.is_blocked(&FeatureSubset::singleton(1)));
        // {0} is out, so the guess moves on to {1}.
        assert_eq!(dualizer.next_unexplained_subset(), Some(FeatureSubset::from([0, 2])));

        dualizer.discard(FeatureSubset::singleton(1));
        // Every remaining hitting set contains a discarded guess.
        assert_eq!(dualizer.next_unexplained_subset(), None);
        dualizer.reset();
        assert_eq!(dualizer.next_unexplained_subset(), Some(FeatureSubset::full(3)));
    }

    proptest! {
        #[test]
        fn every_enumerated_set_is_a_distinct_minimal_hitting_set(
            raw in prop::collection::vec(prop::collection::btree_set(0usize..6, 1..4), 0..6)
        ) {
            let family: Vec<FeatureSubset> = raw.into_iter().map(|s| s.into_iter().collect()).collect();
            let found = minimal_hitting_sets(&family, None);
            let unique: HashSet<_> = found.iter().cloned().collect();
            prop_assert_eq!(unique.len(), found.len());
            for h in &found {
                prop_assert!(is_minimal_hitting_set(h, &family));
            }
            // Completeness against brute force over the 6-feature lattice.
            let brute = SubsetsBySize::new(6).filter(|h| is_minimal_hitting_set(h, &family)).count();
            prop_assert_eq!(brute, found.len());
        }
    }
}
