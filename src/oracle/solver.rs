// src/oracle/solver.rs
use crate::core::{ClassLabel, Decision, DomainTable, FeatureSubset, Instance, Result};
use crate::oracle::check_query;
use crate::traits::{ConstraintBackend, EntailmentOracle};

/// Entailment through a [`ConstraintBackend`]. Answers are exactly as
/// certain as the backend reports them.
pub struct SolverChecker<'a> {
    backend: &'a dyn ConstraintBackend,
}

impl<'a> SolverChecker<'a> {
    pub fn new(backend: &'a dyn ConstraintBackend) -> Self {
        SolverChecker { backend }
    }
}

impl EntailmentOracle for SolverChecker<'_> {
    fn describe(&self) -> &'static str {
        "solver"
    }

    fn is_cxp_candidate(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        check_query(instance, free, domains)?;
        self.backend.find_counterexample(instance, free, target, domains)
    }
}
