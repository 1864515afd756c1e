pub mod data;
pub mod errors;
pub mod subset;

pub use data::*; // Re-export common data types
pub use errors::*;
pub use subset::FeatureSubset;
