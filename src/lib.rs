// src/lib.rs

//! `ffa_rs` computes formal feature attributions (FFA) for classifier
//! predictions by enumerating abductive and contrastive explanations
//! (AXp's and CXp's) under a time budget.
//!
//! The enumeration alternates between the two explanation kinds through
//! their hitting-set duality: every AXp hits every CXp. Attribution of a
//! feature is the fraction of AXp's found so far that contain it, so a run
//! stopped early still yields a usable, if partial, answer.

pub mod algorithms;
pub mod core;
pub mod models;
pub mod oracle;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{
    attribution, explain, explain_batch, explain_with_backend, explain_with_oracle, CancelToken,
    EnumerationConfig, EnumerationOutcome, ExplainRequest, FinalState, HittingSetDualizer, Progress, RunState,
    RunStats, XpEnumerator,
};
pub use crate::core::{
    Attribution, ClassLabel, Decision, DomainTable, Exactness, Explanation, ExplanationKind, FeatureDomain,
    FeatureSubset, FfaError, Instance, Result,
};
pub use crate::models::{DecisionTree, FnClassifier, LinearClassifier, TreeNode};
pub use crate::oracle::{Entailment, EntailmentStrategy};
pub use crate::traits::{Classifier, ConstraintBackend, EntailmentOracle};
