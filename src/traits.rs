// src/traits.rs

//! The collaborator seams of the enumeration engine: the classifier being
//! explained, the entailment oracle that reasons about it, and the optional
//! constraint backend a solver-based oracle delegates to.

use crate::core::{ClassLabel, Decision, DomainTable, FeatureSubset, Instance, Result};

/// A trained classifier treated as an opaque decision oracle.
///
/// `predict` must be a deterministic, side-effect free function of the full
/// assignment. Implementations report unusable inputs with
/// [`FfaError::OracleUnavailable`](crate::core::FfaError::OracleUnavailable).
pub trait Classifier: Send + Sync {
    fn num_features(&self) -> usize;

    fn predict(&self, instance: &Instance) -> Result<ClassLabel>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn num_features(&self) -> usize {
        (**self).num_features()
    }

    fn predict(&self, instance: &Instance) -> Result<ClassLabel> {
        (**self).predict(instance)
    }
}

/// Decides whether feature subsets are AXp / CXp candidates for a prediction.
///
/// Both queries are read-only and return the same answer for identical inputs.
pub trait EntailmentOracle {
    /// Short name used in logs.
    fn describe(&self) -> &'static str;

    /// True iff some completion of `free` (all other features fixed to the
    /// instance) is classified differently from `target`.
    fn is_cxp_candidate(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision>;

    /// True iff every completion of the features outside `fixed` is
    /// classified as `target`.
    fn is_axp_candidate(
        &self,
        instance: &Instance,
        fixed: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        let free = fixed.complement(instance.len());
        Ok(self.is_cxp_candidate(instance, &free, target, domains)?.negated())
    }
}

/// A reasoning service over a classifier's structure.
///
/// Answers the existential half of the entailment question: is there an
/// assignment that agrees with `instance` outside `free`, respects the
/// domains, and is not classified as `target`? A positive answer should
/// carry the assignment as its witness. A backend that gives up early (a
/// solver timeout, a sampled search) reports its answer as
/// [`Exactness::Approximate`](crate::core::Exactness::Approximate).
pub trait ConstraintBackend: Send + Sync {
    fn find_counterexample(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision>;
}
