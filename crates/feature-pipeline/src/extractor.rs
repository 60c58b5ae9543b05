//! Component A: Feature Extractor.
//!
//! Grounded on `original_source/app/adaptive/features.py` (the `_ema`/`_atr`/
//! `_bollinger_bandwidth`/`build_features` functions) for exact semantics,
//! and on `technical_analysis::ema` for the EMA recurrence (same
//! seed-then-smooth shape, reused directly rather than reimplemented).

use analysis_core::{Candle, CoreError, FeatureVector};

const EMA_FAST_PERIOD: usize = 12;
const EMA_SLOW_PERIOD: usize = 26;
const ATR_PERIOD: usize = 14;
const BB_PERIOD: usize = 20;
const BB_K: f64 = 2.0;

/// Simple mean of true ranges over `period` (spec §4.A: "ATR uses simple
/// mean of true ranges over period" — deliberately not Wilder's smoothed
/// recurrence that `technical_analysis::atr` uses for the equities domain).
fn atr_simple_mean(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period + 1 {
        return None;
    }
    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let hl = cur.high - cur.low;
            let hc = (cur.high - prev.close).abs();
            let lc = (cur.low - prev.close).abs();
            hl.max(hc).max(lc)
        })
        .collect();
    let window = &true_ranges[true_ranges.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Bollinger bandwidth = (2k*sigma) / |mu| over the trailing `period` closes.
fn bollinger_bandwidth(closes: &[f64], period: usize, k: f64) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let mu = window.iter().sum::<f64>() / period as f64;
    if mu == 0.0 {
        return None;
    }
    let variance = window.iter().map(|c| (c - mu).powi(2)).sum::<f64>() / period as f64;
    let sigma = variance.sqrt();
    Some((2.0 * k * sigma) / mu.abs())
}

/// Build the feature vector for one (symbol, timeframe) candle window.
///
/// Contract (spec §4.A): empty input is a validation error; any indicator
/// whose window isn't satisfied is simply `None`, not an error.
pub fn build_features(candles: &[Candle]) -> Result<FeatureVector, CoreError> {
    if candles.is_empty() {
        return Err(CoreError::InvalidData("Empty market data".to_string()));
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let last_close = closes.last().copied();

    let ema_fast = if closes.len() >= EMA_FAST_PERIOD {
        technical_analysis::ema(&closes, EMA_FAST_PERIOD).last().copied()
    } else {
        None
    };
    let ema_slow = if closes.len() >= EMA_SLOW_PERIOD {
        technical_analysis::ema(&closes, EMA_SLOW_PERIOD).last().copied()
    } else {
        None
    };
    let ema_spread = match (ema_fast, ema_slow) {
        (Some(f), Some(s)) => Some(f - s),
        _ => None,
    };

    let atr = atr_simple_mean(candles, ATR_PERIOD);
    let atr_pct = match (atr, last_close) {
        (Some(a), Some(c)) if c != 0.0 => Some(a / c),
        _ => None,
    };

    let bb_width = bollinger_bandwidth(&closes, BB_PERIOD, BB_K);

    Ok(FeatureVector {
        last_close,
        ema_fast,
        ema_slow,
        ema_spread,
        atr,
        atr_pct,
        bb_width,
        n_bars: candles.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Timeframe;
    use chrono::{TimeZone, Utc};

    fn candle(i: usize, close: f64) -> Candle {
        Candle {
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::M15,
            time: Utc.timestamp_opt(1_700_000_000 + i as i64 * 900, 0).unwrap(),
            open: close - 0.2,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = build_features(&[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidData(_)));
    }

    #[test]
    fn short_series_yields_null_indicators() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 2000.0 + i as f64)).collect();
        let fv = build_features(&candles).unwrap();
        assert!(fv.last_close.is_some());
        assert!(fv.ema_fast.is_none());
        assert!(fv.atr.is_none());
        assert!(fv.bb_width.is_none());
    }

    #[test]
    fn long_series_fills_all_fields() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| candle(i, 2000.0 + (i as f64 * 0.3).sin() * 5.0))
            .collect();
        let fv = build_features(&candles).unwrap();
        assert!(fv.ema_fast.is_some());
        assert!(fv.ema_slow.is_some());
        assert!(fv.atr.is_some());
        assert!(fv.bb_width.is_some());
        assert_eq!(fv.n_bars, 40);
    }
}
