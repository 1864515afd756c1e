//! Helpers for consumers that compare attribution vectors.

pub mod metrics;

pub use metrics::{kendall_tau, top_k_agreement};
