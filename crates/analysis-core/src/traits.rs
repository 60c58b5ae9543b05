use async_trait::async_trait;

use crate::{Candle, CoreError, DxyContext, TradingSignal, Timeframe};

/// Component F: composes the feature/regime/rule/model/scorer stages into a
/// single scored signal for one (symbol, timeframe).
#[async_trait]
pub trait SignalAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<TradingSignal, CoreError>;
}

/// Capability value for an opaque model artifact (spec §9's design note).
/// Implemented by a registered variant per `ModelType`; the registry never
/// inspects the concrete model, only calls this method.
pub trait Predictor: Send + Sync {
    /// Returns `[p_sell, p_hold, p_buy]` for one feature row, aligned to
    /// `feature_names()`. Features missing from the caller's input vector
    /// are imputed as 0.0 by the caller before this is invoked.
    fn predict_proba(&self, features: &[f64]) -> [f64; 3];

    fn feature_names(&self) -> &[String];
}

/// Supplies the latest published DXY context (component J) to any reader
/// (the Rule Analyzers and Scorer); `None` when nothing has been published
/// yet. Kept as a trait so components F and J don't depend on each other
/// directly.
pub trait DxyContextSource: Send + Sync {
    fn current(&self) -> Option<DxyContext>;
}
