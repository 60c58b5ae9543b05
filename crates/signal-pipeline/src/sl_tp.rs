//! Stop-loss / take-profit computation (spec §4.F step 6).
//!
//! SL is the nearest opposite-type order block extremum with a small
//! buffer; when no opposite-type block is usable (none detected, or on
//! the wrong side of price), falls back to ±0.5% of the entry price. TP is
//! placed so `|TP - entry| = 2 * |entry - SL|`, same risk:reward as
//! `original_source/backend/app/core/trading_engine.py::_calculate_tp`.

use rule_analyzers::smc::{self, OrderBlock, OrderBlockType};

/// Price-unit buffer beyond the order block extremum, matching the
/// original's flat buffer for gold-scale instruments.
const OB_BUFFER: f64 = 5.0;
const FALLBACK_PCT: f64 = 0.005;
const RISK_REWARD_MULTIPLE: f64 = 2.0;

pub struct LevelsResult {
    pub sl: f64,
    pub tp: f64,
}

fn sl_from_bullish_action(blocks: &[OrderBlock], entry: f64) -> f64 {
    match smc::nearest_order_block(blocks, entry, Some(OrderBlockType::Bearish)) {
        Some(ob) if ob.low < entry => ob.low - OB_BUFFER,
        _ => entry * (1.0 - FALLBACK_PCT),
    }
}

fn sl_from_bearish_action(blocks: &[OrderBlock], entry: f64) -> f64 {
    match smc::nearest_order_block(blocks, entry, Some(OrderBlockType::Bullish)) {
        Some(ob) if ob.high > entry => ob.high + OB_BUFFER,
        _ => entry * (1.0 + FALLBACK_PCT),
    }
}

pub fn compute_levels(is_bullish_action: bool, entry: f64, order_blocks: &[OrderBlock]) -> LevelsResult {
    let sl = if is_bullish_action {
        sl_from_bullish_action(order_blocks, entry)
    } else {
        sl_from_bearish_action(order_blocks, entry)
    };

    let risk = (entry - sl).abs();
    let tp = if is_bullish_action {
        entry + risk * RISK_REWARD_MULTIPLE
    } else {
        entry - risk * RISK_REWARD_MULTIPLE
    };

    LevelsResult { sl, tp }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rule_analyzers::smc::ObStrength;

    fn ob(ob_type: OrderBlockType, high: f64, low: f64) -> OrderBlock {
        OrderBlock {
            ob_type,
            high,
            low,
            open: (high + low) / 2.0,
            close: (high + low) / 2.0,
            volume: 100.0,
            time: Utc::now(),
            strength: ObStrength::Strong,
        }
    }

    #[test]
    fn buy_uses_nearest_bearish_ob_below_entry() {
        let blocks = vec![ob(OrderBlockType::Bearish, 1995.0, 1990.0)];
        let levels = compute_levels(true, 2000.0, &blocks);
        assert_eq!(levels.sl, 1990.0 - OB_BUFFER);
        assert!((levels.tp - 2000.0 - (2000.0 - levels.sl) * 2.0).abs() < 1e-9);
    }

    #[test]
    fn buy_falls_back_when_no_bearish_ob() {
        let levels = compute_levels(true, 2000.0, &[]);
        assert!((levels.sl - 2000.0 * 0.995).abs() < 1e-9);
    }

    #[test]
    fn sell_uses_nearest_bullish_ob_above_entry() {
        let blocks = vec![ob(OrderBlockType::Bullish, 2010.0, 2005.0)];
        let levels = compute_levels(false, 2000.0, &blocks);
        assert_eq!(levels.sl, 2010.0 + OB_BUFFER);
    }

    #[test]
    fn risk_reward_ratio_is_always_two() {
        let levels = compute_levels(true, 2000.0, &[]);
        let risk = (2000.0 - levels.sl).abs();
        assert!((levels.tp - (2000.0 + risk * 2.0)).abs() < 1e-9);
    }
}
