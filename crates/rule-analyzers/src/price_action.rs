//! Price Action sub-analyzer (spec §4.C).
//!
//! Candlestick detection reuses `technical_analysis::patterns` directly
//! (same shapes, same thresholds). Support/resistance clustering and trend
//! direction are ported from
//! `original_source/backend/app/strategies/price_action.py`
//! (`find_support_resistance`/`_cluster_levels`/`analyze_trend`).

use analysis_core::Candle;
use serde::{Deserialize, Serialize};
use technical_analysis::{detect_patterns, PatternMatch};

const SR_LOOKBACK: usize = 100;
const SR_TOLERANCE: f64 = 0.5;
const TREND_MIN_BARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelType {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportResistanceLevel {
    pub level: f64,
    pub level_type: LevelType,
    pub touches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    pub ema_20: f64,
    pub ema_50: f64,
}

#[derive(Debug, Clone)]
pub struct PriceActionReport {
    pub patterns: Vec<PatternMatch>,
    pub levels: Vec<SupportResistanceLevel>,
    pub trend: TrendReport,
}

/// Runs candlestick detection over every trailing window (matches the
/// Python loop over `range(2, len(data))`), not just the last candle.
fn detect_all_patterns(candles: &[Candle]) -> Vec<PatternMatch> {
    if candles.len() < 3 {
        return Vec::new();
    }
    let mut patterns = Vec::new();
    for end in 3..=candles.len() {
        patterns.extend(detect_patterns(&candles[..end]));
    }
    patterns
}

fn find_swings(window: &[Candle]) -> (Vec<f64>, Vec<f64>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    if window.len() < 5 {
        return (highs, lows);
    }
    for i in 2..window.len() - 2 {
        let h = window[i].high;
        if h > window[i - 1].high && h > window[i - 2].high && h > window[i + 1].high && h > window[i + 2].high {
            highs.push(h);
        }
        let l = window[i].low;
        if l < window[i - 1].low && l < window[i - 2].low && l < window[i + 1].low && l < window[i + 2].low {
            lows.push(l);
        }
    }
    (highs, lows)
}

fn cluster_levels(levels: &[f64], tolerance: f64) -> Vec<(f64, usize)> {
    let mut clusters: Vec<(f64, usize)> = Vec::new();
    for &price in levels {
        if let Some(cluster) = clusters.iter_mut().find(|(p, _)| (price - *p).abs() <= tolerance) {
            cluster.1 += 1;
        } else {
            clusters.push((price, 1));
        }
    }
    clusters
}

pub fn find_support_resistance(candles: &[Candle]) -> Vec<SupportResistanceLevel> {
    let lookback = SR_LOOKBACK.min(candles.len());
    let recent = &candles[candles.len() - lookback..];
    let (highs, lows) = find_swings(recent);

    let mut levels: Vec<SupportResistanceLevel> = cluster_levels(&highs, SR_TOLERANCE)
        .into_iter()
        .filter(|(_, touches)| *touches >= 2)
        .map(|(level, touches)| SupportResistanceLevel { level, level_type: LevelType::Resistance, touches })
        .collect();

    levels.extend(
        cluster_levels(&lows, SR_TOLERANCE)
            .into_iter()
            .filter(|(_, touches)| *touches >= 2)
            .map(|(level, touches)| SupportResistanceLevel { level, level_type: LevelType::Support, touches }),
    );

    levels.sort_by(|a, b| b.touches.cmp(&a.touches));
    levels
}

pub fn analyze_trend(candles: &[Candle]) -> TrendReport {
    if candles.len() < TREND_MIN_BARS {
        return TrendReport { direction: TrendDirection::Neutral, ema_20: 0.0, ema_50: 0.0 };
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ema_20 = *technical_analysis::ema(&closes, 20).last().unwrap();
    let ema_50 = *technical_analysis::ema(&closes, 50).last().unwrap();
    let current_price = *closes.last().unwrap();

    let direction = if ema_20 > ema_50 && current_price > ema_20 {
        TrendDirection::Bullish
    } else if ema_20 < ema_50 && current_price < ema_20 {
        TrendDirection::Bearish
    } else {
        TrendDirection::Neutral
    };

    TrendReport { direction, ema_20, ema_50 }
}

pub fn analyze(candles: &[Candle]) -> PriceActionReport {
    PriceActionReport {
        patterns: detect_all_patterns(candles),
        levels: find_support_resistance(candles),
        trend: analyze_trend(candles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Timeframe;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::M15,
            time: Utc.timestamp_opt(1_700_000_000 + i * 900, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn trend_neutral_on_short_series() {
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, 2000.0, 2001.0, 1999.0, 2000.0)).collect();
        let trend = analyze_trend(&candles);
        assert_eq!(trend.direction, TrendDirection::Neutral);
    }

    #[test]
    fn bullish_trend_from_rising_closes() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let close = 2000.0 + i as f64 * 0.5;
                candle(i, close - 0.2, close + 0.3, close - 0.3, close)
            })
            .collect();
        let trend = analyze_trend(&candles);
        assert_eq!(trend.direction, TrendDirection::Bullish);
    }

    #[test]
    fn support_resistance_requires_at_least_two_touches() {
        let mut candles: Vec<Candle> = (0..30).map(|i| candle(i, 2000.0, 2000.5 + (i % 3) as f64 * 0.01, 1999.5, 2000.0)).collect();
        candles[10] = candle(10, 2000.0, 2010.0, 1999.0, 2000.0);
        candles[20] = candle(20, 2000.0, 2010.0, 1999.0, 2000.0);
        let levels = find_support_resistance(&candles);
        assert!(levels.iter().all(|l| l.touches >= 2));
    }
}
