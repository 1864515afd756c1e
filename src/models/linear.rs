// src/models/linear.rs
use crate::core::{ClassLabel, Decision, DomainTable, FeatureSubset, FfaError, Instance, Result};
use crate::models::check_assignment;
use crate::traits::{Classifier, ConstraintBackend};
use ndarray::Array1;

/// Binary linear threshold classifier: class 1 iff `w·x + b > 0`.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    weights: Array1<f64>,
    bias: f64,
}

impl LinearClassifier {
    pub fn new(weights: Vec<f64>, bias: f64) -> Result<Self> {
        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(FfaError::InvalidInput(
                "Linear classifier coefficients must be finite.".to_string(),
            ));
        }
        Ok(LinearClassifier { weights: Array1::from(weights), bias })
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    fn score(&self, instance: &Instance) -> f64 {
        instance.dot(&self.weights) + self.bias
    }
}

impl Classifier for LinearClassifier {
    fn num_features(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, instance: &Instance) -> Result<ClassLabel> {
        check_assignment(instance, self.weights.len())?;
        Ok(usize::from(self.score(instance) > 0.0))
    }
}

impl ConstraintBackend for LinearClassifier {
    /// The score is separable, so its extreme over the free domains is
    /// reached by pushing each free feature to the bound that moves the
    /// score away from the target class.
    fn find_counterexample(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        check_assignment(instance, self.weights.len())?;
        if target > 1 {
            // The model never predicts `target`, so the instance itself differs.
            return Ok(Decision::exact(true).with_witness(instance.clone()));
        }

        let mut candidate = instance.clone();
        for feature in free.iter() {
            let domain = domains.get(feature).ok_or_else(|| {
                FfaError::IncompatibleDimensions(format!("No domain for feature {}.", feature))
            })?;
            let (low, high) = domain.bounds();
            let w = self.weights[feature];
            // target 1 needs the score driven down, target 0 up.
            let push_up = target == 0;
            candidate[feature] = if w == 0.0 {
                instance[feature]
            } else if (w > 0.0) == push_up {
                high
            } else {
                low
            };
        }

        let class = usize::from(self.score(&candidate) > 0.0);
        Ok(if class != target {
            Decision::exact(true).with_witness(candidate)
        } else {
            Decision::exact(false)
        })
    }
}
