// src/core/data.rs
use crate::core::errors::{FfaError, Result};
use crate::core::subset::FeatureSubset;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a single data instance (a row of features).
/// We use `f64` for flexibility with both continuous and encoded categorical features.
pub type Instance = Array1<f64>;

/// Index of a predicted class.
pub type ClassLabel = usize;

/// Tolerance used when matching a value against a categorical domain.
const VALUE_TOLERANCE: f64 = 1e-12;

/// The admissible values of one feature while it is free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureDomain {
    /// Closed continuous range `[low, high]`.
    Interval { low: f64, high: f64 },
    /// Finite set of admissible values.
    Categorical(Vec<f64>),
}

impl FeatureDomain {
    pub fn interval(low: f64, high: f64) -> Self {
        FeatureDomain::Interval { low, high }
    }

    pub fn categorical(values: impl Into<Vec<f64>>) -> Self {
        FeatureDomain::Categorical(values.into())
    }

    /// Binary `{0, 1}` feature.
    pub fn boolean() -> Self {
        FeatureDomain::Categorical(vec![0.0, 1.0])
    }

    pub fn contains(&self, value: f64) -> bool {
        match self {
            FeatureDomain::Interval { low, high } => *low <= value && value <= *high,
            FeatureDomain::Categorical(values) => values
                .iter()
                .any(|v| (v - value).abs() <= VALUE_TOLERANCE * v.abs().max(1.0)),
        }
    }

    /// Smallest and largest admissible value.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            FeatureDomain::Interval { low, high } => (*low, *high),
            FeatureDomain::Categorical(values) => values.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &v| (lo.min(v), hi.max(v)),
            ),
        }
    }

    /// Whether enumerating `candidate_values` covers the whole domain.
    pub fn is_finite(&self) -> bool {
        match self {
            FeatureDomain::Interval { low, high } => low == high,
            FeatureDomain::Categorical(_) => true,
        }
    }

    /// Values an exhaustive search tries for this feature.
    ///
    /// Categorical domains yield every value. Intervals yield `grid_points`
    /// evenly spaced values (both endpoints included) plus `anchor`, the
    /// instance's own value, so the grid always contains the instance.
    pub fn candidate_values(&self, grid_points: usize, anchor: f64) -> Vec<f64> {
        match self {
            FeatureDomain::Categorical(values) => values.clone(),
            FeatureDomain::Interval { low, high } => {
                if low == high {
                    return vec![*low];
                }
                let points = grid_points.max(2);
                let step = (high - low) / (points - 1) as f64;
                let mut values: Vec<f64> = (0..points).map(|i| low + step * i as f64).collect();
                // Pin the last point to avoid accumulated rounding past `high`.
                values[points - 1] = *high;
                if self.contains(anchor) && !values.iter().any(|v| *v == anchor) {
                    values.push(anchor);
                }
                values.sort_by(f64::total_cmp);
                values
            }
        }
    }

    /// Draw one admissible value uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            FeatureDomain::Interval { low, high } => {
                if low == high {
                    *low
                } else {
                    Uniform::new_inclusive(*low, *high).sample(rng)
                }
            }
            FeatureDomain::Categorical(values) => values.choose(rng).copied().unwrap_or(f64::NAN),
        }
    }

    fn check_well_formed(&self, feature: usize) -> Result<()> {
        match self {
            FeatureDomain::Interval { low, high } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(FfaError::InvalidInput(format!(
                        "Feature {} has malformed interval [{}, {}].",
                        feature, low, high
                    )));
                }
            }
            FeatureDomain::Categorical(values) => {
                if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
                    return Err(FfaError::InvalidInput(format!(
                        "Feature {} has an empty or non-finite categorical domain.",
                        feature
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Per-feature domains, indexed by feature id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainTable(Vec<FeatureDomain>);

impl DomainTable {
    pub fn new(domains: Vec<FeatureDomain>) -> Self {
        DomainTable(domains)
    }

    /// `n` features sharing the interval `[low, high]`.
    pub fn uniform_interval(n: usize, low: f64, high: f64) -> Self {
        DomainTable(vec![FeatureDomain::interval(low, high); n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, feature: usize) -> Option<&FeatureDomain> {
        self.0.get(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDomain> {
        self.0.iter()
    }

    /// True when every feature in `free` has a finite domain.
    pub fn all_finite(&self, free: &FeatureSubset) -> bool {
        free.iter().all(|f| self.0.get(f).map_or(false, FeatureDomain::is_finite))
    }

    /// Checks that the table matches `instance` and contains its values.
    pub fn validate(&self, instance: &Instance) -> Result<()> {
        if self.0.len() != instance.len() {
            return Err(FfaError::IncompatibleDimensions(format!(
                "Domain table has {} features, but the instance has {}.",
                self.0.len(),
                instance.len()
            )));
        }
        for (feature, (domain, &value)) in self.0.iter().zip(instance.iter()).enumerate() {
            domain.check_well_formed(feature)?;
            if !domain.contains(value) {
                return Err(FfaError::InvalidInput(format!(
                    "Feature {} value {} lies outside its domain {:?}.",
                    feature, value, domain
                )));
            }
        }
        Ok(())
    }
}

impl std::ops::Index<usize> for DomainTable {
    type Output = FeatureDomain;

    fn index(&self, feature: usize) -> &FeatureDomain {
        &self.0[feature]
    }
}

/// Whether a decision was reached by exact reasoning or by approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exactness {
    Exact,
    Approximate,
}

impl Exactness {
    pub fn is_exact(self) -> bool {
        self == Exactness::Exact
    }

    /// `Approximate` as soon as either side is.
    pub fn and(self, other: Exactness) -> Exactness {
        if self.is_exact() && other.is_exact() {
            Exactness::Exact
        } else {
            Exactness::Approximate
        }
    }
}

/// Answer of an entailment query.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub holds: bool,
    pub exactness: Exactness,
    /// Completion that predicts a class other than the target, when one was found.
    pub witness: Option<Instance>,
}

impl Decision {
    pub fn exact(holds: bool) -> Self {
        Decision { holds, exactness: Exactness::Exact, witness: None }
    }

    pub fn approximate(holds: bool) -> Self {
        Decision { holds, exactness: Exactness::Approximate, witness: None }
    }

    pub fn with_witness(mut self, witness: Instance) -> Self {
        self.witness = Some(witness);
        self
    }

    /// Same evidence, opposite question (AXp of `S` vs CXp of the complement).
    pub fn negated(self) -> Self {
        Decision { holds: !self.holds, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplanationKind {
    /// AXp: fixing these features entails the prediction.
    Abductive,
    /// CXp: freeing these features can change the prediction.
    Contrastive,
}

impl ExplanationKind {
    pub fn dual(self) -> Self {
        match self {
            ExplanationKind::Abductive => ExplanationKind::Contrastive,
            ExplanationKind::Contrastive => ExplanationKind::Abductive,
        }
    }
}

/// A certified AXp or CXp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Explanation {
    pub features: FeatureSubset,
    pub kind: ExplanationKind,
    pub exactness: Exactness,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            ExplanationKind::Abductive => "AXp",
            ExplanationKind::Contrastive => "CXp",
        };
        write!(f, "{} {}", tag, self.features)?;
        if !self.exactness.is_exact() {
            write!(f, " (approximate)")?;
        }
        Ok(())
    }
}

/// Formal feature attribution for a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// Fraction of discovered AXp's containing each feature.
    pub scores: Array1<f64>,
    /// Number of AXp's the scores were computed from.
    pub axp_count: usize,
    /// `Exact` only if every contributing AXp was exactly decided.
    pub exactness: Exactness,
}

impl Attribution {
    /// All-zero attribution: no evidence yet.
    pub fn empty(num_features: usize) -> Self {
        Attribution {
            scores: Array1::zeros(num_features),
            axp_count: 0,
            exactness: Exactness::Exact,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.axp_count == 0
    }

    pub fn num_features(&self) -> usize {
        self.scores.len()
    }

    /// Scores rescaled to sum to 1.
    ///
    /// All zeros when no feature scores at all. That covers the no-evidence
    /// case and also a prediction no feature can change: its only AXp is the
    /// empty set, so `axp_count` is 1 while every score stays 0.
    pub fn normalized(&self) -> Array1<f64> {
        let total = self.scores.sum();
        if total > 0.0 {
            self.scores.mapv(|s| s / total)
        } else {
            Array1::zeros(self.scores.len())
        }
    }

    /// Feature ids by decreasing score; ties keep index order.
    pub fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.scores.len()).collect();
        order.sort_by(|&a, &b| self.scores[b].total_cmp(&self.scores[a]).then(a.cmp(&b)));
        order
    }
}

impl fmt::Display for Attribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Attribution:")?;
        writeln!(f, "  AXp's:     {}", self.axp_count)?;
        writeln!(f, "  Exactness: {:?}", self.exactness)?;
        writeln!(f, "  Scores:")?;
        for (i, val) in self.scores.iter().enumerate() {
            writeln!(f, "    Feature {}: {:.4}", i, val)?;
        }
        Ok(())
    }
}
