//! Component B: Regime Classifier.
//!
//! Grounded on `original_source/app/adaptive/regimes.py` (`RegimeType`,
//! `MarketRegime`, `clamp01`) for the shape, and spec §4.B for the decision
//! rules. Kill-zone liquidity is injected by the caller (the Signal Pipeline
//! composes this after running the Kill-Zone analyzer) rather than recomputed
//! here, keeping this a pure function of FeatureVector + a liquidity rating.

use std::collections::HashMap;

use analysis_core::{FeatureVector, MarketRegime, RegimePrimary};

/// Default high-volatility ATR% threshold for gold-like instruments (spec
/// §4.B: "default 0.006 for gold-like instruments").
pub const DEFAULT_HIGH_VOL_ATR_PCT: f64 = 0.006;
const TREND_SPREAD_THRESHOLD: f64 = 0.0015;
const RANGE_BB_WIDTH_CEILING: f64 = 0.004;

pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Classify the market regime from a feature vector and the kill-zone's
/// liquidity rating (1-5; `low_liquidity` is a tag derived from it, never a
/// primary on its own).
pub fn classify_regime(
    features: &FeatureVector,
    high_vol_atr_pct_threshold: f64,
    killzone_liquidity_rating: u8,
) -> MarketRegime {
    let mut tags: HashMap<String, bool> = HashMap::new();
    let mut reasons: HashMap<String, f64> = HashMap::new();

    let atr_pct = features.atr_pct.unwrap_or(0.0);
    let ema_spread_pct = match (features.ema_spread, features.last_close) {
        (Some(spread), Some(close)) if close != 0.0 => spread / close,
        _ => 0.0,
    };
    let bb_width = features.bb_width.unwrap_or(0.0);

    reasons.insert("atr_pct".to_string(), atr_pct);
    reasons.insert("ema_spread_pct".to_string(), ema_spread_pct);
    reasons.insert("bb_width".to_string(), bb_width);

    let is_low_liquidity = killzone_liquidity_rating < 3;
    tags.insert("low_liquidity".to_string(), is_low_liquidity);

    let is_high_vol = atr_pct > high_vol_atr_pct_threshold;
    tags.insert("high_volatility".to_string(), is_high_vol);

    if is_high_vol {
        let confidence = clamp01((atr_pct / high_vol_atr_pct_threshold) - 1.0);
        return MarketRegime {
            primary: RegimePrimary::HighVolatility,
            tags,
            confidence,
            reasons,
        };
    }

    if ema_spread_pct.abs() > TREND_SPREAD_THRESHOLD {
        let primary = if ema_spread_pct > 0.0 {
            RegimePrimary::TrendUp
        } else {
            RegimePrimary::TrendDown
        };
        let confidence = clamp01(ema_spread_pct.abs() / (TREND_SPREAD_THRESHOLD * 4.0));
        return MarketRegime {
            primary,
            tags,
            confidence,
            reasons,
        };
    }

    if bb_width <= RANGE_BB_WIDTH_CEILING {
        let confidence = clamp01(1.0 - bb_width / RANGE_BB_WIDTH_CEILING);
        return MarketRegime {
            primary: RegimePrimary::Range,
            tags,
            confidence,
            reasons,
        };
    }

    // Neither a clean trend nor a tight range: low-confidence range call,
    // the conservative default.
    MarketRegime {
        primary: RegimePrimary::Range,
        tags,
        confidence: 0.3,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(ema_spread: f64, last_close: f64, atr_pct: f64, bb_width: f64) -> FeatureVector {
        FeatureVector {
            last_close: Some(last_close),
            ema_fast: Some(last_close + ema_spread / 2.0),
            ema_slow: Some(last_close - ema_spread / 2.0),
            ema_spread: Some(ema_spread),
            atr: Some(atr_pct * last_close),
            atr_pct: Some(atr_pct),
            bb_width: Some(bb_width),
            n_bars: 50,
        }
    }

    #[test]
    fn high_volatility_wins_over_trend() {
        let f = fv(10.0, 2000.0, 0.02, 0.05);
        let regime = classify_regime(&f, DEFAULT_HIGH_VOL_ATR_PCT, 5);
        assert_eq!(regime.primary, RegimePrimary::HighVolatility);
        assert!(regime.confidence > 0.0);
    }

    #[test]
    fn trend_up_from_positive_spread() {
        let f = fv(8.0, 2000.0, 0.002, 0.01);
        let regime = classify_regime(&f, DEFAULT_HIGH_VOL_ATR_PCT, 5);
        assert_eq!(regime.primary, RegimePrimary::TrendUp);
    }

    #[test]
    fn range_from_tight_bands() {
        let f = fv(0.1, 2000.0, 0.001, 0.002);
        let regime = classify_regime(&f, DEFAULT_HIGH_VOL_ATR_PCT, 5);
        assert_eq!(regime.primary, RegimePrimary::Range);
    }

    #[test]
    fn low_liquidity_is_a_tag_not_primary() {
        let f = fv(0.1, 2000.0, 0.001, 0.002);
        let regime = classify_regime(&f, DEFAULT_HIGH_VOL_ATR_PCT, 2);
        assert!(regime.tag("low_liquidity"));
        assert_ne!(regime.primary, RegimePrimary::LowLiquidity);
    }

    #[test]
    fn confidence_is_always_clamped() {
        let f = fv(100.0, 2000.0, 0.5, 0.0001);
        let regime = classify_regime(&f, DEFAULT_HIGH_VOL_ATR_PCT, 5);
        assert!(regime.confidence >= 0.0 && regime.confidence <= 1.0);
    }
}
