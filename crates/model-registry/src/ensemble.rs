//! Ensemble prediction: combine xgboost + lightgbm (+ lstm, if registered)
//! into one direction/probability call.
//!
//! Grounded on `original_source/app/ai/registry/runtime.py`
//! (`predict_from_registry`, `_probs_to_direction`,
//! `_feature_row_from_vector`): equal-weight arithmetic mean across
//! however many of the three model types have an active artifact, and the
//! identical argmax + "abs(buy-sell) < 0.05 or argmax is hold -> neutral"
//! direction rule.

use std::collections::HashMap;

use analysis_core::{FeatureVector, ModelType, Predictor, Timeframe};
use sqlx::AnyPool;

use crate::registry::ModelRegistry;

const MODEL_TYPES: [ModelType; 3] = [ModelType::XgBoost, ModelType::LightGbm, ModelType::Lstm];
const NEUTRAL_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone)]
pub struct EnsemblePrediction {
    pub direction: Direction,
    pub prob: f64,
    /// (P(sell), P(hold), P(buy))
    pub probs: (f64, f64, f64),
    pub used_models: Vec<(ModelType, String)>,
}

/// Builds the named feature row a `Predictor` expects, imputing 0.0 for
/// any name the pipeline didn't produce.
fn feature_map(features: &FeatureVector) -> HashMap<&'static str, f64> {
    let mut map = HashMap::new();
    map.insert("last_close", features.last_close.unwrap_or(0.0));
    map.insert("ema_fast", features.ema_fast.unwrap_or(0.0));
    map.insert("ema_slow", features.ema_slow.unwrap_or(0.0));
    map.insert("ema_spread", features.ema_spread.unwrap_or(0.0));
    map.insert("atr", features.atr.unwrap_or(0.0));
    map.insert("atr_pct", features.atr_pct.unwrap_or(0.0));
    map.insert("bb_width", features.bb_width.unwrap_or(0.0));
    map
}

fn build_row(predictor: &dyn Predictor, features: &FeatureVector) -> Vec<f64> {
    let map = feature_map(features);
    predictor
        .feature_names()
        .iter()
        .map(|name| map.get(name.as_str()).copied().unwrap_or(0.0))
        .collect()
}

fn direction_from_probs(sell: f64, hold: f64, buy: f64) -> (Direction, f64) {
    let best = buy.max(sell).max(hold);
    if best == hold || (buy - sell).abs() < NEUTRAL_MARGIN {
        return (Direction::Neutral, hold.max(0.5));
    }
    if buy > sell {
        (Direction::Bullish, buy)
    } else {
        (Direction::Bearish, sell)
    }
}

/// Returns `None` when no model type has an active, loadable artifact for
/// this (symbol, timeframe) — the Scorer then proceeds without an ML
/// component rather than blocking.
pub async fn predict_ensemble(
    registry: &ModelRegistry,
    pool: &AnyPool,
    symbol: &str,
    timeframe: Timeframe,
    features: &FeatureVector,
) -> Option<EnsemblePrediction> {
    let mut sell_acc = 0.0;
    let mut hold_acc = 0.0;
    let mut buy_acc = 0.0;
    let mut used = Vec::new();

    for &model_type in MODEL_TYPES.iter() {
        let (predictor, entry) = registry.get(pool, model_type, symbol, timeframe).await;
        if let (Some(predictor), Some(entry)) = (predictor, entry) {
            let row = build_row(predictor.as_ref(), features);
            let p = predictor.predict_proba(&row);
            sell_acc += p[0];
            hold_acc += p[1];
            buy_acc += p[2];
            used.push((model_type, entry.version));
        }
    }

    if used.is_empty() {
        return None;
    }

    let n = used.len() as f64;
    let (sell, hold, buy) = (sell_acc / n, hold_acc / n, buy_acc / n);
    let (direction, prob) = direction_from_probs(sell, hold, buy);

    Some(EnsemblePrediction { direction, prob, probs: (sell, hold, buy), used_models: used })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_hold_is_always_neutral() {
        let (dir, prob) = direction_from_probs(0.2, 0.6, 0.2);
        assert_eq!(dir, Direction::Neutral);
        assert_eq!(prob, 0.6);
    }

    #[test]
    fn close_buy_sell_margin_is_neutral() {
        let (dir, _) = direction_from_probs(0.48, 0.04, 0.48);
        assert_eq!(dir, Direction::Neutral);
    }

    #[test]
    fn clear_buy_majority_is_bullish() {
        let (dir, prob) = direction_from_probs(0.1, 0.1, 0.8);
        assert_eq!(dir, Direction::Bullish);
        assert_eq!(prob, 0.8);
    }

    #[test]
    fn clear_sell_majority_is_bearish() {
        let (dir, prob) = direction_from_probs(0.8, 0.1, 0.1);
        assert_eq!(dir, Direction::Bearish);
        assert_eq!(prob, 0.8);
    }
}
