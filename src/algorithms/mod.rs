pub mod dualizer;
pub mod ffa;
pub mod xpenum;

pub use dualizer::{minimal_hitting_set, minimal_hitting_sets, HittingSetDualizer, HittingSets, Insertion};
pub use ffa::attribution;
pub use xpenum::{
    explain, explain_batch, explain_with_backend, explain_with_oracle, CancelToken, EnumerationConfig,
    EnumerationOutcome, ExplainRequest, FinalState, Progress, RunState, RunStats, XpEnumerator,
};
