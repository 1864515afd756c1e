// src/utils/metrics.rs
use crate::core::{FfaError, Result};
use ndarray::ArrayView1;
use std::collections::HashSet;

/// Kendall rank correlation (tau-b, tie corrected) between two score vectors.
///
/// Returns `0.0` when the coefficient is undefined, i.e. when either vector
/// is constant.
pub fn kendall_tau(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(FfaError::IncompatibleDimensions(format!(
            "Cannot correlate vectors of length {} and {}.",
            a.len(),
            b.len()
        )));
    }

    let n = a.len();
    let (mut concordant, mut discordant) = (0i64, 0i64);
    let (mut ties_a, mut ties_b) = (0i64, 0i64);
    for i in 0..n {
        for j in (i + 1)..n {
            let da = a[i] - a[j];
            let db = b[i] - b[j];
            match (da == 0.0, db == 0.0) {
                (true, true) => {}
                (true, false) => ties_a += 1,
                (false, true) => ties_b += 1,
                (false, false) => {
                    if (da > 0.0) == (db > 0.0) {
                        concordant += 1;
                    } else {
                        discordant += 1;
                    }
                }
            }
        }
    }

    Ok(tau_b(concordant, discordant, ties_a, ties_b))
}

/// Tau-b from pair counts. The product of the untied totals is taken in
/// `f64`; pair counts grow quadratically and their product leaves `i64`
/// range near 78k entries.
fn tau_b(concordant: i64, discordant: i64, ties_a: i64, ties_b: i64) -> f64 {
    let untied_a = (concordant + discordant + ties_a) as f64;
    let untied_b = (concordant + discordant + ties_b) as f64;
    let denominator = (untied_a * untied_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (concordant - discordant) as f64 / denominator
}

/// Fraction of the top-`k` features (by score) the two vectors share.
pub fn top_k_agreement(a: ArrayView1<f64>, b: ArrayView1<f64>, k: usize) -> Result<f64> {
    if a.len() != b.len() {
        return Err(FfaError::IncompatibleDimensions(format!(
            "Cannot compare vectors of length {} and {}.",
            a.len(),
            b.len()
        )));
    }
    let k = k.min(a.len());
    if k == 0 {
        return Ok(0.0);
    }
    let top_a: HashSet<usize> = top_indices(a, k).into_iter().collect();
    let shared = top_indices(b, k).into_iter().filter(|i| top_a.contains(i)).count();
    Ok(shared as f64 / k as f64)
}

fn top_indices(scores: ArrayView1<f64>, k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| scores[j].total_cmp(&scores[i]).then(i.cmp(&j)));
    order.truncate(k);
    order
}
