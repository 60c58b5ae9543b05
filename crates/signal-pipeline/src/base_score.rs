//! Base score: the pre-Scorer additive heuristic over rule-analyzer output.
//!
//! Grounded on `original_source/backend/app/core/trading_engine.py::
//! _generate_signal`: strong order blocks ±30, value-area position ±20,
//! EMA(20)/EMA(50) trend direction ±20, and the last three candlestick
//! patterns ±15 each, clamped to the spec's [-100, 100] additive scale.

use rule_analyzers::{price_action, smc, volume_profile};
use technical_analysis::CandlestickPattern;

const OB_SCORE: i32 = 30;
const VALUE_AREA_SCORE: i32 = 20;
const TREND_SCORE: i32 = 20;
const PATTERN_SCORE: i32 = 15;
const RECENT_PATTERNS: usize = 3;

fn is_bullish_pattern(p: &technical_analysis::PatternMatch) -> bool {
    matches!(
        p.pattern,
        CandlestickPattern::Engulfing | CandlestickPattern::MorningStar | CandlestickPattern::Hammer
    ) && p.bullish
}

fn is_bearish_pattern(p: &technical_analysis::PatternMatch) -> bool {
    matches!(
        p.pattern,
        CandlestickPattern::Engulfing | CandlestickPattern::EveningStar | CandlestickPattern::ShootingStar
    ) && !p.bullish
}

pub struct BaseScore {
    pub score: i32,
    pub reasons: Vec<String>,
}

pub fn compute(
    smc_report: &smc::SmcReport,
    volume_profile: Option<&volume_profile::VolumeProfile>,
    price_action: &price_action::PriceActionReport,
    current_price: f64,
) -> BaseScore {
    let mut score: i32 = 0;
    let mut reasons = Vec::new();

    let strong_bullish_ob = smc_report
        .order_blocks
        .iter()
        .find(|ob| ob.ob_type == smc::OrderBlockType::Bullish && matches!(ob.strength, smc::ObStrength::Strong | smc::ObStrength::VeryStrong));
    let strong_bearish_ob = smc_report
        .order_blocks
        .iter()
        .find(|ob| ob.ob_type == smc::OrderBlockType::Bearish && matches!(ob.strength, smc::ObStrength::Strong | smc::ObStrength::VeryStrong));

    if let Some(ob) = strong_bullish_ob {
        score += OB_SCORE;
        reasons.push(format!("Strong bullish OB at {:.2}", ob.low));
    }
    if let Some(ob) = strong_bearish_ob {
        score -= OB_SCORE;
        reasons.push(format!("Strong bearish OB at {:.2}", ob.high));
    }

    if let Some(vp) = volume_profile {
        match vp.position_of(current_price) {
            volume_profile::PricePosition::Below => {
                score += VALUE_AREA_SCORE;
                reasons.push("Price below value area (potential long)".to_string());
            }
            volume_profile::PricePosition::Above => {
                score -= VALUE_AREA_SCORE;
                reasons.push("Price above value area (potential short)".to_string());
            }
            volume_profile::PricePosition::Inside => {}
        }
    }

    match price_action.trend.direction {
        price_action::TrendDirection::Bullish => {
            score += TREND_SCORE;
            reasons.push("Bullish trend".to_string());
        }
        price_action::TrendDirection::Bearish => {
            score -= TREND_SCORE;
            reasons.push("Bearish trend".to_string());
        }
        price_action::TrendDirection::Neutral => {}
    }

    let recent = if price_action.patterns.len() > RECENT_PATTERNS {
        &price_action.patterns[price_action.patterns.len() - RECENT_PATTERNS..]
    } else {
        &price_action.patterns[..]
    };
    for pattern in recent {
        if is_bullish_pattern(pattern) {
            score += PATTERN_SCORE;
            reasons.push(format!("Bullish pattern: {:?}", pattern.pattern));
        } else if is_bearish_pattern(pattern) {
            score -= PATTERN_SCORE;
            reasons.push(format!("Bearish pattern: {:?}", pattern.pattern));
        }
    }

    BaseScore { score: score.clamp(-100, 100), reasons }
}
