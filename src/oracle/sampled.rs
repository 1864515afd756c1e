// src/oracle/sampled.rs
use crate::core::{ClassLabel, Decision, DomainTable, FeatureSubset, Instance, Result};
use crate::oracle::check_query;
use crate::traits::{Classifier, EntailmentOracle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Decides entailment by testing random completions of the free features.
///
/// Finding a witness proves a class change exactly. Not finding one after
/// `samples` draws only suggests entailment, so such answers are flagged
/// approximate. Each query reseeds from the base seed and the queried
/// subset, so repeating a query repeats its answer.
pub struct SampledChecker<'a> {
    classifier: &'a dyn Classifier,
    samples: usize,
    base_seed: u64,
}

impl<'a> SampledChecker<'a> {
    /// Without a seed, a base seed is drawn once for the checker's lifetime.
    pub fn new(classifier: &'a dyn Classifier, samples: usize, seed: Option<u64>) -> Self {
        SampledChecker {
            classifier,
            samples,
            base_seed: seed.unwrap_or_else(rand::random),
        }
    }

    fn rng_for(&self, free: &FeatureSubset, target: ClassLabel) -> StdRng {
        let mut hasher = DefaultHasher::new();
        free.hash(&mut hasher);
        target.hash(&mut hasher);
        StdRng::seed_from_u64(self.base_seed ^ hasher.finish())
    }
}

impl EntailmentOracle for SampledChecker<'_> {
    fn describe(&self) -> &'static str {
        "sampled"
    }

    fn is_cxp_candidate(
        &self,
        instance: &Instance,
        free: &FeatureSubset,
        target: ClassLabel,
        domains: &DomainTable,
    ) -> Result<Decision> {
        check_query(instance, free, domains)?;

        // Nothing to vary: the instance is the only completion.
        if free.is_empty() {
            let differs = self.classifier.predict(instance)? != target;
            return Ok(if differs {
                Decision::exact(true).with_witness(instance.clone())
            } else {
                Decision::exact(false)
            });
        }

        let mut rng = self.rng_for(free, target);
        let mut candidate = instance.clone();
        for _ in 0..self.samples {
            for feature in free.iter() {
                candidate[feature] = domains[feature].sample(&mut rng);
            }
            if self.classifier.predict(&candidate)? != target {
                return Ok(Decision::exact(true).with_witness(candidate));
            }
        }
        Ok(Decision::approximate(false))
    }
}
