//! Volume Profile sub-analyzer (spec §4.C).
//!
//! Grounded on `original_source/backend/app/strategies/volume_profile.py`:
//! the price-row histogram, 70%-of-volume value-area expansion from the POC,
//! and the HVN/LVN one-std-dev node classification are ported directly.

use analysis_core::Candle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_ROW_SIZE: f64 = 1.0;
const VALUE_AREA_FRACTION: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Hvn,
    Lvn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeNode {
    pub price_level: f64,
    pub volume: f64,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricePosition {
    Above,
    Below,
    Inside,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
    pub value_area_volume: f64,
    pub total_volume: f64,
    pub nodes: Vec<VolumeNode>,
}

impl VolumeProfile {
    pub fn value_area_width(&self) -> f64 {
        self.vah - self.val
    }

    pub fn position_of(&self, price: f64) -> PricePosition {
        if price > self.vah {
            PricePosition::Above
        } else if price < self.val {
            PricePosition::Below
        } else {
            PricePosition::Inside
        }
    }

    pub fn nearest_hvn(&self, price: f64) -> Option<f64> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Hvn)
            .min_by(|a, b| (a.price_level - price).abs().total_cmp(&(b.price_level - price).abs()))
            .map(|n| n.price_level)
    }
}

/// Price levels are quantized to `row_size`-sized buckets keyed by integer
/// row index to avoid float-key hashing, matching the Python histogram's
/// row-stepped levels exactly at the bucket boundary.
fn row_key(price: f64, low_anchor: f64, row_size: f64) -> i64 {
    ((price - low_anchor) / row_size).floor() as i64
}

pub fn calculate(candles: &[Candle], row_size: f64) -> Option<VolumeProfile> {
    if candles.is_empty() {
        return None;
    }
    let row_size = if row_size > 0.0 { row_size } else { DEFAULT_ROW_SIZE };
    let global_low = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    let mut price_volume: BTreeMap<i64, f64> = BTreeMap::new();
    for candle in candles {
        let num_rows = (((candle.high - candle.low) / row_size) as i64).max(1);
        let volume_per_row = candle.volume / num_rows as f64;
        for i in 0..num_rows {
            let level = candle.low + i as f64 * row_size;
            let key = row_key(level, global_low, row_size);
            *price_volume.entry(key).or_insert(0.0) += volume_per_row;
        }
    }

    if price_volume.is_empty() {
        return None;
    }

    let levels: Vec<(f64, f64)> = price_volume
        .iter()
        .map(|(&k, &v)| (global_low + k as f64 * row_size, v))
        .collect();

    let total_volume: f64 = levels.iter().map(|(_, v)| v).sum();
    let (max_idx, &(poc, poc_volume)) = levels
        .iter()
        .enumerate()
        .max_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
        .map(|(i, l)| (i, l))?;

    let target = total_volume * VALUE_AREA_FRACTION;
    let mut current_volume = poc_volume;
    let mut vah_idx = max_idx;
    let mut val_idx = max_idx;

    while current_volume < target {
        let mut expanded = false;
        if vah_idx < levels.len() - 1 {
            vah_idx += 1;
            current_volume += levels[vah_idx].1;
            expanded = true;
        }
        if val_idx > 0 {
            val_idx -= 1;
            current_volume += levels[val_idx].1;
            expanded = true;
        }
        if !expanded {
            break;
        }
    }

    let vah = levels[vah_idx].0;
    let val = levels[val_idx].0;

    let volumes: Vec<f64> = levels.iter().map(|(_, v)| *v).collect();
    let avg = volumes.iter().sum::<f64>() / volumes.len() as f64;
    let variance = volumes.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / volumes.len() as f64;
    let std = variance.sqrt();

    let nodes = levels
        .iter()
        .filter_map(|&(price, volume)| {
            if volume > avg + std {
                Some(VolumeNode { price_level: price, volume, node_type: NodeType::Hvn })
            } else if volume < avg - std {
                Some(VolumeNode { price_level: price, volume, node_type: NodeType::Lvn })
            } else {
                None
            }
        })
        .collect();

    Some(VolumeProfile {
        poc,
        vah,
        val,
        value_area_volume: current_volume,
        total_volume,
        nodes,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeBias {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDelta {
    pub bias: VolumeBias,
    pub delta_percent: f64,
}

pub fn volume_delta(candles: &[Candle]) -> VolumeDelta {
    if candles.len() < 2 {
        return VolumeDelta { bias: VolumeBias::Neutral, delta_percent: 0.0 };
    }
    let mut buy = 0.0;
    let mut sell = 0.0;
    for candle in candles {
        if candle.close > candle.open {
            buy += candle.volume;
        } else if candle.close < candle.open {
            sell += candle.volume;
        } else {
            buy += candle.volume / 2.0;
            sell += candle.volume / 2.0;
        }
    }
    let total = buy + sell;
    if total == 0.0 {
        return VolumeDelta { bias: VolumeBias::Neutral, delta_percent: 0.0 };
    }
    let delta = buy - sell;
    let delta_percent = (delta.abs() / total) * 100.0;
    let bias = if delta > 0.0 {
        VolumeBias::Bullish
    } else if delta < 0.0 {
        VolumeBias::Bearish
    } else {
        VolumeBias::Neutral
    };
    VolumeDelta { bias, delta_percent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Timeframe;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, low: f64, high: f64, close: f64, volume: f64) -> Candle {
        Candle {
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::M15,
            time: Utc.timestamp_opt(1_700_000_000 + i * 900, 0).unwrap(),
            open: (low + high) / 2.0,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(calculate(&[], 1.0).is_none());
    }

    #[test]
    fn poc_is_highest_volume_level() {
        let candles = vec![
            candle(0, 1995.0, 1996.0, 1995.5, 10.0),
            candle(1, 2000.0, 2001.0, 2000.5, 500.0),
            candle(2, 2005.0, 2006.0, 2005.5, 10.0),
        ];
        let profile = calculate(&candles, 1.0).unwrap();
        assert!((profile.poc - 2000.0).abs() < 1.0);
        assert!(profile.vah >= profile.val);
    }

    #[test]
    fn value_area_width_non_negative() {
        let candles: Vec<Candle> = (0..30).map(|i| candle(i, 2000.0 + i as f64 * 0.1, 2000.5 + i as f64 * 0.1, 2000.2 + i as f64 * 0.1, 50.0)).collect();
        let profile = calculate(&candles, 0.5).unwrap();
        assert!(profile.value_area_width() >= 0.0);
    }

    #[test]
    fn bullish_delta_from_mostly_up_candles() {
        let candles = vec![
            candle(0, 1999.0, 2001.0, 2000.5, 100.0),
            candle(1, 2000.0, 2002.0, 2001.5, 100.0),
        ];
        let delta = volume_delta(&candles);
        assert_eq!(delta.bias, VolumeBias::Bullish);
    }
}
