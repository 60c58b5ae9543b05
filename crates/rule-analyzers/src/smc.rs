//! Smart Money Concepts sub-analyzer (spec §4.C).
//!
//! Grounded on `original_source/backend/app/strategies/smc.py`: order-block
//! detection, fair-value-gap imbalances, liquidity sweeps and the
//! break-of-structure swing-count heuristic are ported directly, operating
//! on `Candle` windows instead of dict lists.

use analysis_core::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const OB_LOOKBACK: usize = 50;
const MIN_FVG_GAP: f64 = 0.1;
const SWEEP_SWING_LOOKBACK: usize = 20;
const STRUCTURE_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderBlockType {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObStrength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl ObStrength {
    fn rank(&self) -> u8 {
        match self {
            ObStrength::Weak => 1,
            ObStrength::Moderate => 2,
            ObStrength::Strong => 3,
            ObStrength::VeryStrong => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBlock {
    pub ob_type: OrderBlockType,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub close: f64,
    pub volume: f64,
    pub time: DateTime<Utc>,
    pub strength: ObStrength,
}

impl OrderBlock {
    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FvgType {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairValueGap {
    pub fvg_type: FvgType,
    pub top: f64,
    pub bottom: f64,
    pub time: DateTime<Utc>,
    pub is_filled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepSide {
    High,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquiditySweep {
    pub side: SweepSide,
    pub level: f64,
    pub time: DateTime<Utc>,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureTrend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BosDirection {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStructure {
    pub trend: StructureTrend,
    pub bos: Option<BosDirection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmcReport {
    pub order_blocks: Vec<OrderBlock>,
    pub fvgs: Vec<FairValueGap>,
    pub sweeps: Vec<LiquiditySweep>,
    pub structure: MarketStructure,
}

fn ob_strength(candles: &[Candle], ob_idx: usize, move_idx: usize, ob_type: OrderBlockType) -> ObStrength {
    let window_start = candles.len().saturating_sub(20);
    let avg_volume = {
        let window = &candles[window_start..];
        window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64
    };
    let ob = &candles[ob_idx];
    let mv = &candles[move_idx];
    let volume_ratio = if avg_volume > 0.0 { ob.volume / avg_volume } else { 1.0 };

    let move_size_pct = match ob_type {
        OrderBlockType::Bullish => (mv.close - ob.high) / ob.high * 100.0,
        OrderBlockType::Bearish => (ob.low - mv.close) / ob.low * 100.0,
    };

    let mut score = 0;
    if volume_ratio > 2.0 {
        score += 2;
    } else if volume_ratio > 1.5 {
        score += 1;
    }
    if move_size_pct > 1.0 {
        score += 2;
    } else if move_size_pct > 0.5 {
        score += 1;
    }

    match score {
        s if s >= 4 => ObStrength::VeryStrong,
        3 => ObStrength::Strong,
        2 => ObStrength::Moderate,
        _ => ObStrength::Weak,
    }
}

fn detect_order_blocks(candles: &[Candle]) -> Vec<OrderBlock> {
    let start = candles.len().saturating_sub(OB_LOOKBACK);
    let recent = &candles[start..];
    let mut blocks = Vec::new();

    for i in 1..recent.len().saturating_sub(1) {
        let prev_idx = start + i - 1;
        let cur_idx = start + i;
        let next_idx = start + i + 1;
        let cur = &candles[cur_idx];
        let next = &candles[next_idx];
        let _ = prev_idx;

        if cur.close < cur.open && next.close > next.open && next.close > cur.high {
            let strength = ob_strength(candles, cur_idx, next_idx, OrderBlockType::Bullish);
            blocks.push(OrderBlock {
                ob_type: OrderBlockType::Bullish,
                high: cur.high,
                low: cur.low,
                open: cur.open,
                close: cur.close,
                volume: cur.volume,
                time: cur.time,
                strength,
            });
        } else if cur.close > cur.open && next.close < next.open && next.close < cur.low {
            let strength = ob_strength(candles, cur_idx, next_idx, OrderBlockType::Bearish);
            blocks.push(OrderBlock {
                ob_type: OrderBlockType::Bearish,
                high: cur.high,
                low: cur.low,
                open: cur.open,
                close: cur.close,
                volume: cur.volume,
                time: cur.time,
                strength,
            });
        }
    }

    blocks.sort_by(|a, b| b.strength.rank().cmp(&a.strength.rank()).then(b.time.cmp(&a.time)));
    blocks
}

fn detect_fvg(candles: &[Candle]) -> Vec<FairValueGap> {
    let mut fvgs = Vec::new();
    if candles.len() < 3 {
        return fvgs;
    }
    for i in 0..candles.len() - 2 {
        let c1 = &candles[i];
        let c2 = &candles[i + 1];

        if c2.low > c1.high {
            let gap = c2.low - c1.high;
            if gap >= MIN_FVG_GAP {
                fvgs.push(FairValueGap {
                    fvg_type: FvgType::Bullish,
                    top: c2.low,
                    bottom: c1.high,
                    time: c2.time,
                    is_filled: false,
                });
            }
        } else if c2.high < c1.low {
            let gap = c1.low - c2.high;
            if gap >= MIN_FVG_GAP {
                fvgs.push(FairValueGap {
                    fvg_type: FvgType::Bearish,
                    top: c1.low,
                    bottom: c2.high,
                    time: c2.time,
                    is_filled: false,
                });
            }
        }
    }

    if let Some(last) = candles.last() {
        for fvg in &mut fvgs {
            fvg.is_filled = match fvg.fvg_type {
                FvgType::Bullish => last.close <= fvg.bottom,
                FvgType::Bearish => last.close >= fvg.top,
            };
        }
    }
    fvgs
}

fn find_swings(window: &[Candle]) -> (Vec<(usize, f64)>, Vec<(usize, f64)>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    if window.len() < 5 {
        return (highs, lows);
    }
    for i in 2..window.len() - 2 {
        let h = window[i].high;
        if h > window[i - 1].high && h > window[i - 2].high && h > window[i + 1].high && h > window[i + 2].high {
            highs.push((i, h));
        }
        let l = window[i].low;
        if l < window[i - 1].low && l < window[i - 2].low && l < window[i + 1].low && l < window[i + 2].low {
            lows.push((i, l));
        }
    }
    (highs, lows)
}

fn detect_liquidity_sweeps(candles: &[Candle]) -> Vec<LiquiditySweep> {
    let mut sweeps = Vec::new();
    if candles.len() < SWEEP_SWING_LOOKBACK + 5 {
        return sweeps;
    }

    let window_end = candles.len() - 5;
    let window_start = window_end.saturating_sub(SWEEP_SWING_LOOKBACK);
    let (highs, lows) = find_swings(&candles[window_start..window_end]);
    let last_candles = &candles[candles.len() - 5..];

    for &(_, level) in highs.iter().rev().take(3) {
        for candle in last_candles {
            if candle.high > level * 1.001 && candle.close < level {
                sweeps.push(LiquiditySweep {
                    side: SweepSide::High,
                    level,
                    time: candle.time,
                    volume: candle.volume,
                });
                break;
            }
        }
    }

    for &(_, level) in lows.iter().rev().take(3) {
        for candle in last_candles {
            if candle.low < level * 0.999 && candle.close > level {
                sweeps.push(LiquiditySweep {
                    side: SweepSide::Low,
                    level,
                    time: candle.time,
                    volume: candle.volume,
                });
                break;
            }
        }
    }

    sweeps
}

fn analyze_structure(candles: &[Candle]) -> MarketStructure {
    if candles.len() < STRUCTURE_LOOKBACK {
        return MarketStructure { trend: StructureTrend::Neutral, bos: None };
    }
    let recent = &candles[candles.len() - STRUCTURE_LOOKBACK..];
    let highs: Vec<f64> = recent.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = recent.iter().map(|c| c.low).collect();

    let hh = (1..highs.len()).filter(|&i| highs[i] > highs[i - 1]).count();
    let hl = (1..lows.len()).filter(|&i| lows[i] > lows[i - 1]).count();
    let lh = (1..highs.len()).filter(|&i| highs[i] < highs[i - 1]).count();
    let ll = (1..lows.len()).filter(|&i| lows[i] < lows[i - 1]).count();

    let trend = if hh > lh && hl > ll {
        StructureTrend::Bullish
    } else if lh > hh && ll > hl {
        StructureTrend::Bearish
    } else {
        StructureTrend::Neutral
    };

    let major_high = if highs.len() > 5 {
        highs[..highs.len() - 5].iter().cloned().fold(f64::MIN, f64::max)
    } else {
        highs[0]
    };
    let major_low = if lows.len() > 5 {
        lows[..lows.len() - 5].iter().cloned().fold(f64::MAX, f64::min)
    } else {
        lows[0]
    };

    let last_close = recent.last().unwrap().close;
    let bos = if last_close > major_high {
        Some(BosDirection::Bullish)
    } else if last_close < major_low {
        Some(BosDirection::Bearish)
    } else {
        None
    };

    MarketStructure { trend, bos }
}

pub fn analyze(candles: &[Candle]) -> SmcReport {
    SmcReport {
        order_blocks: detect_order_blocks(candles),
        fvgs: detect_fvg(candles),
        sweeps: detect_liquidity_sweeps(candles),
        structure: analyze_structure(candles),
    }
}

/// Nearest active order block to `price`, optionally filtered by type.
pub fn nearest_order_block(
    blocks: &[OrderBlock],
    price: f64,
    ob_type: Option<OrderBlockType>,
) -> Option<OrderBlock> {
    blocks
        .iter()
        .filter(|ob| ob_type.map_or(true, |t| t == ob.ob_type))
        .min_by(|a, b| (a.mid() - price).abs().total_cmp(&(b.mid() - price).abs()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Timeframe;
    use chrono::TimeZone;

    fn candle(i: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::M15,
            time: Utc.timestamp_opt(1_700_000_000 + i * 900, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn bullish_order_block_detected_before_strong_move() {
        let mut candles: Vec<Candle> = (0..10).map(|i| candle(i, 2000.0, 2002.0, 1998.0, 2000.5, 100.0)).collect();
        candles[5] = candle(5, 2000.0, 2001.0, 1995.0, 1996.0, 100.0); // bearish OB candle
        candles[6] = candle(6, 1996.0, 2010.0, 1996.0, 2008.0, 400.0); // strong bullish move
        let report = analyze(&candles);
        assert!(report.order_blocks.iter().any(|ob| ob.ob_type == OrderBlockType::Bullish));
    }

    #[test]
    fn bullish_fvg_requires_minimum_gap() {
        let candles = vec![
            candle(0, 2000.0, 2001.0, 1999.0, 2000.5, 100.0),
            candle(1, 2002.0, 2003.0, 2002.0, 2002.5, 100.0),
            candle(2, 2003.0, 2004.0, 2002.5, 2003.5, 100.0),
        ];
        let fvgs = detect_fvg(&candles);
        assert_eq!(fvgs.len(), 1);
        assert_eq!(fvgs[0].fvg_type, FvgType::Bullish);
    }

    #[test]
    fn no_structure_signal_on_short_window() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 2000.0, 2001.0, 1999.0, 2000.0, 100.0)).collect();
        let structure = analyze_structure(&candles);
        assert_eq!(structure.trend, StructureTrend::Neutral);
        assert!(structure.bos.is_none());
    }
}
