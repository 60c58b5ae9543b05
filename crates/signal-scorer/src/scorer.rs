//! Component E (scoring half): converts a candidate signal's inputs into a
//! comparable, auditable score.
//!
//! Grounded on `original_source/app/adaptive/scorer.py::score_signal`:
//! same component values, same per-regime weight multiplication applied
//! after accumulation, same reasons-collects-every-negative-cause rule.

use std::collections::HashMap;

use analysis_core::{MarketRegime, RegimePrimary, ScoreBreakdown};

const CONFIDENCE_WEIGHT: f64 = 60.0;
const REGIME_MATCH_BONUS: f64 = 15.0;
const REGIME_MISMATCH_PENALTY: f64 = -20.0;
const KILLZONE_BONUS: f64 = 10.0;
const KILLZONE_PENALTY: f64 = -50.0;
const SPREAD_PENALTY: f64 = -15.0;
const DXY_PENALTY: f64 = -12.0;
const RR_PENALTY: f64 = -10.0;

pub struct ScoreInputs<'a> {
    pub base_confidence: f64,
    pub regime: &'a MarketRegime,
    pub supported_regimes: Option<&'a [RegimePrimary]>,
    pub killzone_can_trade: bool,
    pub spread_ok: bool,
    pub dxy_ok: bool,
    pub rr_ok: bool,
    pub regime_weights: Option<&'a HashMap<String, f64>>,
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

pub fn score_signal(inputs: ScoreInputs) -> ScoreBreakdown {
    let mut components: HashMap<String, f64> = HashMap::new();
    let mut reasons: Vec<String> = Vec::new();

    components.insert("confidence".to_string(), CONFIDENCE_WEIGHT * clamp01(inputs.base_confidence));

    match inputs.supported_regimes {
        Some(supported) if supported.contains(&inputs.regime.primary) => {
            components.insert("regime_match".to_string(), REGIME_MATCH_BONUS);
        }
        Some(_) => {
            components.insert("regime_mismatch".to_string(), REGIME_MISMATCH_PENALTY);
            reasons.push(format!("Regime mismatch: {}", inputs.regime.primary.as_str()));
        }
        None => {
            components.insert("regime_unknown".to_string(), 0.0);
        }
    }

    if inputs.killzone_can_trade {
        components.insert("killzone".to_string(), KILLZONE_BONUS);
    } else {
        components.insert("killzone".to_string(), KILLZONE_PENALTY);
        reasons.push("Outside optimal trading hours".to_string());
    }

    if !inputs.spread_ok {
        components.insert("spread".to_string(), SPREAD_PENALTY);
        reasons.push("Spread/liquidity not acceptable".to_string());
    }

    if !inputs.dxy_ok {
        components.insert("dxy".to_string(), DXY_PENALTY);
        reasons.push("DXY context adverse".to_string());
    }

    if !inputs.rr_ok {
        components.insert("rr".to_string(), RR_PENALTY);
        reasons.push("Risk/Reward not acceptable".to_string());
    }

    if let Some(weights) = inputs.regime_weights {
        for (k, v) in components.iter_mut() {
            let w = weights.get(k).copied().unwrap_or(1.0);
            *v *= w;
        }
    }

    let total = components.values().sum();

    ScoreBreakdown { total, components, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn regime(primary: RegimePrimary) -> MarketRegime {
        MarketRegime { primary, tags: Map::new(), confidence: 0.8, reasons: Map::new() }
    }

    #[test]
    fn killzone_penalty_adds_reason() {
        let r = regime(RegimePrimary::TrendUp);
        let breakdown = score_signal(ScoreInputs {
            base_confidence: 0.7,
            regime: &r,
            supported_regimes: Some(&[RegimePrimary::TrendUp]),
            killzone_can_trade: false,
            spread_ok: true,
            dxy_ok: true,
            rr_ok: true,
            regime_weights: None,
        });
        assert_eq!(*breakdown.components.get("killzone").unwrap(), -50.0);
        assert!(breakdown.reasons.iter().any(|r| r.contains("optimal trading hours")));
    }

    #[test]
    fn regime_mismatch_is_penalized_and_explained() {
        let r = regime(RegimePrimary::Range);
        let breakdown = score_signal(ScoreInputs {
            base_confidence: 0.5,
            regime: &r,
            supported_regimes: Some(&[RegimePrimary::TrendUp, RegimePrimary::TrendDown]),
            killzone_can_trade: true,
            spread_ok: true,
            dxy_ok: true,
            rr_ok: true,
            regime_weights: None,
        });
        assert_eq!(*breakdown.components.get("regime_mismatch").unwrap(), -20.0);
        assert!(breakdown.reasons.iter().any(|r| r.starts_with("Regime mismatch")));
    }

    #[test]
    fn regime_weights_multiply_after_accumulation() {
        let r = regime(RegimePrimary::TrendUp);
        let mut weights = Map::new();
        weights.insert("confidence".to_string(), 2.0);
        let breakdown = score_signal(ScoreInputs {
            base_confidence: 0.5,
            regime: &r,
            supported_regimes: None,
            killzone_can_trade: true,
            spread_ok: true,
            dxy_ok: true,
            rr_ok: true,
            regime_weights: Some(&weights),
        });
        // base confidence component = 60 * 0.5 = 30, doubled by the weight.
        assert_eq!(*breakdown.components.get("confidence").unwrap(), 60.0);
    }

    #[test]
    fn all_negatives_accumulate_reasons() {
        let r = regime(RegimePrimary::Range);
        let breakdown = score_signal(ScoreInputs {
            base_confidence: 0.3,
            regime: &r,
            supported_regimes: None,
            killzone_can_trade: false,
            spread_ok: false,
            dxy_ok: false,
            rr_ok: false,
            regime_weights: None,
        });
        assert_eq!(breakdown.reasons.len(), 4);
    }
}
