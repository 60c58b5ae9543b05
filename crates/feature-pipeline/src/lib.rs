pub mod extractor;
pub mod regime;

pub use extractor::build_features;
pub use regime::{classify_regime, clamp01, DEFAULT_HIGH_VOL_ATR_PCT};
