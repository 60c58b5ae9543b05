//! Component F: Signal Pipeline (`analyze`), composing components A-E.

pub mod base_score;
pub mod pipeline;
pub mod sl_tp;

pub use analysis_core::DxyContextSource;
pub use pipeline::SignalPipeline;
