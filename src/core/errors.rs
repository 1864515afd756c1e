// src/core/errors.rs
use thiserror::Error;

use crate::core::subset::FeatureSubset;

#[derive(Debug, Error)]
pub enum FfaError {
    /// The wrapped classifier could not score an assignment. Local to one query.
    #[error("Oracle Unavailable: {0}")]
    OracleUnavailable(String),

    /// An exhaustive query would have to enumerate too many completions.
    #[error("Search Space Too Large: {completions} completions exceed the limit of {limit}")]
    SearchSpaceTooLarge { completions: u128, limit: usize },

    /// A new explanation broke minimality or duality against the store.
    /// Fatal for the run; carries the store as it was when the check failed.
    #[error("Invariant Violation: {message} (AXps: {axps:?}, CXps: {cxps:?})")]
    InvariantViolation {
        message: String,
        axps: Vec<FeatureSubset>,
        cxps: Vec<FeatureSubset>,
    },

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),

    #[error("Ndarray Error: {0}")]
    NdarrayError(#[from] ndarray::ShapeError),
}

impl FfaError {
    /// Errors that only invalidate the query that raised them, not the run.
    pub fn is_query_local(&self) -> bool {
        matches!(
            self,
            FfaError::OracleUnavailable(_) | FfaError::SearchSpaceTooLarge { .. }
        )
    }
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, FfaError>;
