//! Entailment oracles.
//!
//! Three ways of answering the AXp/CXp questions about a classifier, picked
//! by [`EntailmentStrategy`] rather than by the caller's type:
//!
//! - [`ExhaustiveChecker`]: enumerates completions over finite or gridded domains.
//! - [`SampledChecker`]: draws random completions; a miss is only approximate.
//! - [`SolverChecker`]: delegates to an exact [`ConstraintBackend`].

pub mod exhaustive;
pub mod sampled;
pub mod solver;

pub use exhaustive::ExhaustiveChecker;
pub use sampled::SampledChecker;
pub use solver::SolverChecker;

use crate::core::{ClassLabel, Decision, DomainTable, FeatureSubset, FfaError, Instance, Result};
use crate::traits::{Classifier, ConstraintBackend, EntailmentOracle};
use serde::{Deserialize, Serialize};

/// How entailment queries are decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntailmentStrategy {
    /// Enumerate every completion of the free features.
    Exhaustive {
        /// Grid resolution used for interval domains.
        grid_points: usize,
        /// Largest number of completions a single query may enumerate.
        max_completions: usize,
    },
    /// Test `samples` random completions per query.
    Sampled { samples: usize, seed: Option<u64> },
    /// Ask a constraint backend; requires one to be supplied with the run.
    Solver,
}

impl Default for EntailmentStrategy {
    fn default() -> Self {
        EntailmentStrategy::Exhaustive {
            grid_points: 11,
            max_completions: 1 << 20,
        }
    }
}

/// The oracle selected for one run.
pub enum Entailment<'a> {
    Exhaustive(ExhaustiveChecker<'a>),
    Sampled(SampledChecker<'a>),
    Solver(SolverChecker<'a>),
    /// A caller-supplied oracle; the configured strategy is not consulted.
    Custom(&'a dyn EntailmentOracle),
}

impl<'a> Entailment<'a> {
    pub fn from_strategy(
        strategy: &EntailmentStrategy,
        classifier: &'a dyn Classifier,
        backend: Option<&'a dyn ConstraintBackend>,
    ) -> Result<Self> {
        match strategy {
            EntailmentStrategy::Exhaustive { grid_points, max_completions } => Ok(
                Entailment::Exhaustive(ExhaustiveChecker::new(classifier, *grid_points, *max_completions)),
            ),
            EntailmentStrategy::Sampled { samples, seed } => {
                if *samples == 0 {
                    return Err(FfaError::InvalidInput(
                        "Sampled entailment needs at least one sample per query.".to_string(),
                    ));
                }
                Ok(Entailment::Sampled(SampledChecker::new(classifier, *samples, *seed)))
            }
            EntailmentStrategy::Solver => {
                let backend = backend.ok_or_else(|| {
                    FfaError::InvalidInput(
                        "Solver entailment selected, but no constraint backend was supplied.".to_string(),
                    )
                })?;
                Ok(Entailment::Solver(SolverChecker::new(backend)))
            }
        }
    }

    fn inner(&self) -> &dyn EntailmentOracle {
        match self {
            Entailment::Exhaustive(checker) => checker,
            Entailment::Sampled(checker) => checker,
            Entailment::Solver(checker) => checker,
            Entailment::Custom(oracle) => *oracle,
        }
    }
}

impl EntailmentOracle for Entailment<'_> {
    fn describe(&self) -> &'static str {
        self.inner().describe()
    }

    fn is_cxp_candidate(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        self.inner().is_cxp_candidate(instance, free, target, domains)
    }

    fn is_axp_candidate(
        &self,
        instance: &Instance,
        fixed: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        self.inner().is_axp_candidate(instance, fixed, target, domains)
    }
}

/// Rejects queries whose subset or domain table does not fit the instance.
pub(crate) fn check_query(instance: &Instance, subset: &FeatureSubset, domains: &DomainTable) -> Result<()> {
    if domains.len() != instance.len() {
        return Err(FfaError::IncompatibleDimensions(format!(
            "Domain table has {} features, but the instance has {}.",
            domains.len(),
            instance.len()
        )));
    }
    if let Some(max) = subset.max_feature() {
        if max >= instance.len() {
            return Err(FfaError::IncompatibleDimensions(format!(
                "Feature {} is out of range for an instance with {} features.",
                max,
                instance.len()
            )));
        }
    }
    Ok(())
}
