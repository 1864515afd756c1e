// src/core/subset.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A set of feature indices.
///
/// The same type plays both roles of the explanation search: the *fixed*
/// features of an AXp candidate and the *free* features of a CXp candidate.
/// The two roles are complements over `0..n`.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSubset(BTreeSet<usize>);

impl FeatureSubset {
    pub fn empty() -> Self {
        FeatureSubset(BTreeSet::new())
    }

    /// Every feature of an `n`-feature instance.
    pub fn full(n: usize) -> Self {
        (0..n).collect()
    }

    pub fn singleton(feature: usize) -> Self {
        std::iter::once(feature).collect()
    }

    /// Features of `0..n` that are not in `self`.
    pub fn complement(&self, n: usize) -> Self {
        (0..n).filter(|f| !self.0.contains(f)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, feature: usize) -> bool {
        self.0.contains(&feature)
    }

    pub fn insert(&mut self, feature: usize) -> bool {
        self.0.insert(feature)
    }

    pub fn remove(&mut self, feature: usize) -> bool {
        self.0.remove(&feature)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn is_subset(&self, other: &FeatureSubset) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_strict_subset(&self, other: &FeatureSubset) -> bool {
        self.len() < other.len() && self.is_subset(other)
    }

    pub fn intersects(&self, other: &FeatureSubset) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn union(&self, other: &FeatureSubset) -> Self {
        self.0.union(&other.0).copied().collect()
    }

    /// `self` without `feature`, leaving `self` untouched.
    pub fn without(&self, feature: usize) -> Self {
        let mut out = self.clone();
        out.remove(feature);
        out
    }

    /// `self` plus `feature`, leaving `self` untouched.
    pub fn with(&self, feature: usize) -> Self {
        let mut out = self.clone();
        out.insert(feature);
        out
    }

    /// Largest index in the set, if any.
    pub fn max_feature(&self) -> Option<usize> {
        self.0.iter().next_back().copied()
    }
}

impl FromIterator<usize> for FeatureSubset {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        FeatureSubset(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[usize; N]> for FeatureSubset {
    fn from(features: [usize; N]) -> Self {
        features.into_iter().collect()
    }
}

impl fmt::Display for FeatureSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, feature) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", feature)?;
        }
        write!(f, "}}")
    }
}

// Sets read better than the derived `FeatureSubset({..})` in error payloads.
impl fmt::Debug for FeatureSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
