//! Classifier adapters.
//!
//! `FnClassifier` wraps any prediction closure as a decision oracle. The
//! linear and tree models additionally expose their structure as a
//! [`ConstraintBackend`](crate::traits::ConstraintBackend), which the solver
//! oracle uses for exact reasoning over continuous domains.

pub mod linear;
pub mod tree;

pub use linear::LinearClassifier;
pub use tree::{DecisionTree, TreeNode};

use crate::core::{ClassLabel, FfaError, Instance, Result};
use crate::traits::Classifier;

/// Rejects assignments a classifier cannot score.
pub(crate) fn check_assignment(instance: &Instance, num_features: usize) -> Result<()> {
    if instance.len() != num_features {
        return Err(FfaError::OracleUnavailable(format!(
            "Model expects {} features, got {}.",
            num_features,
            instance.len()
        )));
    }
    if let Some(i) = instance.iter().position(|v| !v.is_finite()) {
        return Err(FfaError::OracleUnavailable(format!(
            "Feature {} is not a finite number.",
            i
        )));
    }
    Ok(())
}

/// Adapts a prediction closure into a [`Classifier`].
pub struct FnClassifier<F> {
    num_features: usize,
    predict_fn: F,
}

impl<F> FnClassifier<F>
where
    F: Fn(&Instance) -> ClassLabel + Send + Sync,
{
    pub fn new(num_features: usize, predict_fn: F) -> Self {
        FnClassifier { num_features, predict_fn }
    }
}

impl<F> Classifier for FnClassifier<F>
where
    F: Fn(&Instance) -> ClassLabel + Send + Sync,
{
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn predict(&self, instance: &Instance) -> Result<ClassLabel> {
        check_assignment(instance, self.num_features)?;
        Ok((self.predict_fn)(instance))
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("num_features", &self.num_features)
            .finish_non_exhaustive()
    }
}
