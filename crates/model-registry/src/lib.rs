//! Component D: Model Registry Cache + ensemble prediction.

pub mod cache;
pub mod ensemble;
pub mod registry;

pub use ensemble::{predict_ensemble, Direction, EnsemblePrediction};
pub use registry::{ArtifactLoader, ModelRegistry};
