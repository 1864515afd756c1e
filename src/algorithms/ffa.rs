// src/algorithms/ffa.rs
use crate::core::{Attribution, Exactness, Explanation};
use ndarray::Array1;

/// Formal feature attribution of an AXp family.
///
/// Each feature scores the fraction of AXp's that contain it
/// (`count / |AXpSet|`). An empty family gives all zeros, which callers must
/// read as "no evidence yet" rather than as a uniform attribution. The result
/// is exact only if every AXp was decided exactly.
pub fn attribution(axps: &[Explanation], num_features: usize) -> Attribution {
    if axps.is_empty() {
        return Attribution::empty(num_features);
    }

    let mut counts = Array1::<f64>::zeros(num_features);
    let mut exactness = Exactness::Exact;
    for axp in axps {
        for feature in axp.features.iter().filter(|&f| f < num_features) {
            counts[feature] += 1.0;
        }
        exactness = exactness.and(axp.exactness);
    }

    let total = axps.len() as f64;
    Attribution {
        scores: counts.mapv(|c| c / total),
        axp_count: axps.len(),
        exactness,
    }
}
