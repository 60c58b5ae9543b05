//! Universe descriptor: which symbols/timeframes the scanner sweeps each
//! pass, and the weight each symbol contributes to its adjusted score.
//!
//! Grounded on `original_source/backend/app/scanner/universe.py`: a settings
//! JSON blob shallow-merged over hardcoded defaults (gold given full
//! priority, the other metals and majors scaled down), falling back whole
//! to the defaults on missing/invalid JSON.

use analysis_core::Timeframe;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolWeight {
    pub symbol: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub symbols: Vec<SymbolWeight>,
    pub timeframes: Vec<String>,
    pub min_candles: usize,
    pub top_k: usize,
}

impl Universe {
    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.timeframes
            .iter()
            .filter_map(|tf| tf.parse().ok())
            .collect()
    }
}

impl Default for Universe {
    /// Precious metals plus the two DXY-adjacent FX majors named in spec
    /// §4.G, gold weighted to 1.0 and everything else scaled down.
    fn default() -> Self {
        Universe {
            symbols: vec![
                SymbolWeight { symbol: "XAUUSD".to_string(), weight: 1.0 },
                SymbolWeight { symbol: "XAGUSD".to_string(), weight: 0.7 },
                SymbolWeight { symbol: "XPTUSD".to_string(), weight: 0.4 },
                SymbolWeight { symbol: "XPDUSD".to_string(), weight: 0.4 },
                SymbolWeight { symbol: "EURUSD".to_string(), weight: 0.3 },
                SymbolWeight { symbol: "USDJPY".to_string(), weight: 0.3 },
            ],
            timeframes: vec!["M5".to_string(), "M15".to_string(), "H1".to_string()],
            min_candles: 200,
            top_k: 10,
        }
    }
}

/// Parses a settings-stored universe JSON, shallow-merging it over the
/// default so a partial override (e.g. just `top_k`) doesn't drop the rest.
/// Any parse failure or non-object JSON falls back to the default whole,
/// matching `parse_universe`'s `except: return DEFAULT_UNIVERSE`.
pub fn parse_universe(raw: Option<&str>) -> Universe {
    let Some(raw) = raw else { return Universe::default() };
    if raw.trim().is_empty() {
        return Universe::default();
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Universe::default();
    };
    let serde_json::Value::Object(map) = value else {
        return Universe::default();
    };

    let default = Universe::default();
    let symbols = map
        .get("symbols")
        .and_then(|v| serde_json::from_value::<Vec<SymbolWeight>>(v.clone()).ok())
        .unwrap_or(default.symbols);
    let timeframes = map
        .get("timeframes")
        .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
        .unwrap_or(default.timeframes);
    let min_candles = map
        .get("min_candles")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(default.min_candles);
    let top_k = map
        .get("top_k")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(default.top_k);

    Universe { symbols, timeframes, min_candles, top_k }
}

/// `adjusted_score = base_score * symbol_weight` (spec §4.G).
pub fn rank_score(base_score: f64, symbol_weight: f64) -> f64 {
    base_score * symbol_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_raw_falls_back_to_default() {
        let uni = parse_universe(None);
        assert_eq!(uni.symbols[0].symbol, "XAUUSD");
        assert_eq!(uni.top_k, 10);
    }

    #[test]
    fn invalid_json_falls_back_to_default() {
        let uni = parse_universe(Some("not json"));
        assert_eq!(uni.min_candles, 200);
    }

    #[test]
    fn partial_override_merges_over_defaults() {
        let uni = parse_universe(Some(r#"{"top_k": 3}"#));
        assert_eq!(uni.top_k, 3);
        assert_eq!(uni.symbols.len(), 6);
    }

    #[test]
    fn rank_score_scales_base_by_weight() {
        assert_eq!(rank_score(50.0, 0.7), 35.0);
    }
}
