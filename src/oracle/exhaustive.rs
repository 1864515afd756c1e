// src/oracle/exhaustive.rs
use crate::core::{ClassLabel, Decision, DomainTable, Exactness, FeatureSubset, FfaError, Instance, Result};
use crate::oracle::check_query;
use crate::traits::{Classifier, EntailmentOracle};

/// Decides entailment by trying every completion of the free features.
///
/// Categorical domains are enumerated completely, so a negative answer over
/// them is exact. Interval domains are replaced by a grid, which makes a
/// negative answer approximate. A witness is always exact evidence.
pub struct ExhaustiveChecker<'a> {
    classifier: &'a dyn Classifier,
    grid_points: usize,
    max_completions: usize,
}

impl<'a> ExhaustiveChecker<'a> {
    pub fn new(classifier: &'a dyn Classifier, grid_points: usize, max_completions: usize) -> Self {
        ExhaustiveChecker { classifier, grid_points, max_completions }
    }
}

impl EntailmentOracle for ExhaustiveChecker<'_> {
    fn describe(&self) -> &'static str {
        "exhaustive"
    }

    fn is_cxp_candidate(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        check_query(instance, free, domains)?;

        let features: Vec<usize> = free.iter().collect();
        let choices: Vec<Vec<f64>> = features
            .iter()
            .map(|&f| domains[f].candidate_values(self.grid_points, instance[f]))
            .collect();

        let completions = choices
            .iter()
            .fold(1u128, |acc, values| acc.saturating_mul(values.len() as u128));
        if completions > self.max_completions as u128 {
            return Err(FfaError::SearchSpaceTooLarge {
                completions,
                limit: self.max_completions,
            });
        }

        let exactness = if domains.all_finite(free) {
            Exactness::Exact
        } else {
            Exactness::Approximate
        };

        // Odometer over the per-feature choice lists.
        let mut digits = vec![0usize; features.len()];
        let mut candidate = instance.clone();
        loop {
            for (slot, &feature) in features.iter().enumerate() {
                candidate[feature] = choices[slot][digits[slot]];
            }
            if self.classifier.predict(&candidate)? != target {
                return Ok(Decision::exact(true).with_witness(candidate));
            }

            let mut slot = 0;
            loop {
                if slot == digits.len() {
                    return Ok(Decision { holds: false, exactness, witness: None });
                }
                digits[slot] += 1;
                if digits[slot] < choices[slot].len() {
                    break;
                }
                digits[slot] = 0;
                slot += 1;
            }
        }
    }
}
