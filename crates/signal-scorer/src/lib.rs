//! Component E: Scorer + Selection Policy.

pub mod policy;
pub mod scorer;

pub use policy::SelectionPolicyState;
pub use scorer::{score_signal, ScoreInputs};
