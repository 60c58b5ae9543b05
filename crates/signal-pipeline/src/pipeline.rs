//! Component F: the Signal Pipeline `analyze` composition.
//!
//! Grounded on `original_source/backend/app/core/trading_engine.py::
//! analyze_market` for the stage order (rule analyzers → base score → AI
//! registry enhancement → levels) and spec §4.F for the exact steps.

use std::collections::HashMap;
use std::sync::Arc;

use analysis_core::{
    Candle, CoreError, DxyContextSource, DxyImpact, FeatureVector, MarketRegime, RegimePrimary,
    ScoreBreakdown, SignalAction, SignalAnalyzer, SignalSource, Timeframe, TradingSignal,
};
use async_trait::async_trait;
use chrono::Utc;
use model_registry::ModelRegistry;
use signal_scorer::{score_signal, ScoreInputs};
use sqlx::AnyPool;

use crate::base_score;
use crate::sl_tp;

/// Default volume-profile row size for gold-scale instruments (spec
/// §4.C: "$1 for gold").
const DEFAULT_VP_ROW_SIZE: f64 = 1.0;
const MIN_TRADEABLE_LIQUIDITY: u8 = 3;

/// Minimum trailing candle count `analyze` requires before it will score a
/// signal at all (mirrors the Opportunity Scanner's `universe.min_candles`
/// default; below this a window is too short for the EMA(26)/ATR(14)/
/// Bollinger(20) windows to mean anything).
const MIN_CANDLES_FOR_ANALYSIS: usize = 200;

pub struct SignalPipeline {
    pool: AnyPool,
    model_registry: Arc<ModelRegistry>,
    dxy_source: Arc<dyn DxyContextSource>,
}

impl SignalPipeline {
    pub fn new(pool: AnyPool, model_registry: Arc<ModelRegistry>, dxy_source: Arc<dyn DxyContextSource>) -> Self {
        Self { pool, model_registry, dxy_source }
    }
}

fn dxy_adverse(impact: DxyImpact, action_is_bullish: bool) -> bool {
    match (impact, action_is_bullish) {
        (DxyImpact::Bearish, true) => true,
        (DxyImpact::Bullish, false) => true,
        _ => false,
    }
}

#[async_trait]
impl SignalAnalyzer for SignalPipeline {
    async fn analyze(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<TradingSignal, CoreError> {
        let now = Utc::now();
        let kill_zone = rule_analyzers::kill_zone::analyze(now);

        if candles.len() < MIN_CANDLES_FOR_ANALYSIS {
            let breakdown = score_signal(ScoreInputs {
                base_confidence: 0.0,
                regime: &neutral_regime(),
                supported_regimes: None,
                killzone_can_trade: kill_zone.can_trade,
                spread_ok: true,
                dxy_ok: true,
                rr_ok: true,
                regime_weights: None,
            });
            let mut reasons = vec!["insufficient_data".to_string()];
            reasons.extend(kill_zone.reasons.iter().cloned());
            return Ok(wait_signal(symbol, timeframe, candles, &reasons, &breakdown));
        }

        if !kill_zone.can_trade {
            let breakdown = score_signal(ScoreInputs {
                base_confidence: 0.0,
                regime: &neutral_regime(),
                supported_regimes: None,
                killzone_can_trade: false,
                spread_ok: true,
                dxy_ok: true,
                rr_ok: true,
                regime_weights: None,
            });
            return Ok(wait_signal(symbol, timeframe, candles, &kill_zone.reasons, &breakdown));
        }

        let features: FeatureVector = feature_pipeline::build_features(candles)?;
        let regime = feature_pipeline::classify_regime(
            &features,
            feature_pipeline::DEFAULT_HIGH_VOL_ATR_PCT,
            kill_zone.liquidity_rating,
        );

        let dxy_context = self.dxy_source.current();
        let rules = rule_analyzers::analyze(candles, now, DEFAULT_VP_ROW_SIZE, dxy_context.as_ref());

        let entry_price = features.last_close.unwrap_or_else(|| candles.last().map(|c| c.close).unwrap_or(0.0));

        let base = base_score::compute(&rules.smc, rules.volume_profile.as_ref(), &rules.price_action, entry_price);
        let prelim_action = SignalAction::from_score(base.score);

        let ensemble = model_registry::predict_ensemble(&self.model_registry, &self.pool, symbol, timeframe, &features).await;
        let base_confidence = match &ensemble {
            Some(pred) => pred.prob,
            None => (base.score.unsigned_abs() as f64 / 100.0).min(1.0),
        };

        let spread_ok = kill_zone.liquidity_rating >= MIN_TRADEABLE_LIQUIDITY;
        let dxy_ok = rules
            .dxy
            .as_ref()
            .map(|d| !dxy_adverse(d.impact, prelim_action.is_bullish()))
            .unwrap_or(true);

        let breakdown = score_signal(ScoreInputs {
            base_confidence,
            regime: &regime,
            supported_regimes: None,
            killzone_can_trade: kill_zone.can_trade,
            spread_ok,
            dxy_ok,
            rr_ok: true,
            regime_weights: None,
        });

        let action = SignalAction::from_score(breakdown.total.round() as i32);
        let confidence = breakdown.total.abs().min(100.0);

        let levels = sl_tp::compute_levels(action.is_bullish(), entry_price, &rules.smc.order_blocks);

        let mut reasons = base.reasons;
        reasons.extend(breakdown.reasons.iter().cloned());

        let mut context = serde_json::json!({
            "base_score": base.score,
            "regime": regime.primary.as_str(),
            "regime_confidence": regime.confidence,
            "kill_zone": kill_zone.session.as_str(),
            "score_components": breakdown.components,
        });
        if let Some(pred) = &ensemble {
            context["ensemble_direction"] = serde_json::json!(format!("{:?}", pred.direction));
            context["ensemble_prob"] = serde_json::json!(pred.prob);
        }

        Ok(TradingSignal {
            id: None,
            user_id: None,
            source: SignalSource::Engine,
            symbol: symbol.to_string(),
            timeframe,
            action,
            confidence,
            score: breakdown.total,
            entry_price,
            suggested_sl: Some(levels.sl),
            suggested_tp: Some(levels.tp),
            reasons,
            context,
            created_at: now,
        })
    }
}

/// A regime placeholder for the WAIT paths, where `analyze` returns before
/// `feature_pipeline::classify_regime` ever runs. `score_signal` still needs
/// *a* regime to score against; `Range` with zero confidence scores neither
/// a match nor mismatch bonus.
fn neutral_regime() -> MarketRegime {
    MarketRegime { primary: RegimePrimary::Range, tags: HashMap::new(), confidence: 0.0, reasons: HashMap::new() }
}

fn wait_signal(
    symbol: &str,
    timeframe: Timeframe,
    candles: &[Candle],
    reasons: &[String],
    breakdown: &ScoreBreakdown,
) -> TradingSignal {
    let entry_price = candles.last().map(|c| c.close).unwrap_or(0.0);
    TradingSignal {
        id: None,
        user_id: None,
        source: SignalSource::Engine,
        symbol: symbol.to_string(),
        timeframe,
        action: SignalAction::Wait,
        confidence: 0.0,
        score: breakdown.total,
        entry_price,
        suggested_sl: None,
        suggested_tp: None,
        reasons: reasons.to_vec(),
        context: serde_json::json!({ "score_components": breakdown.components }),
        created_at: Utc::now(),
    }
}
