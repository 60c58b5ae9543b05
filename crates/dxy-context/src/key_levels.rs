//! DXY key-level crossing alerts (spec §4.J's supplementary feature).
//!
//! Grounded on `original_source/backend/app/dxy_guardian/tracker.py`:
//! the same named support/resistance/pivot levels and the same
//! break-above-resistance / break-below-support crossing rule, trimmed to
//! just the alert emission (the tracker's own trend/momentum/proximity
//! bookkeeping duplicates what `dxy-context`'s impact/strength computation
//! already covers).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelType {
    Resistance,
    Support,
    Pivot,
}

#[derive(Debug, Clone, Copy)]
pub struct DxyLevel {
    pub price: f64,
    pub level_type: LevelType,
}

/// Default named levels, matching `DXYTracker.KEY_LEVELS`.
pub fn default_levels() -> Vec<DxyLevel> {
    let mut levels = Vec::new();
    for &p in &[110.0, 109.0, 108.0, 107.5, 107.0, 106.5] {
        levels.push(DxyLevel { price: p, level_type: LevelType::Resistance });
    }
    levels.push(DxyLevel { price: 105.0, level_type: LevelType::Pivot });
    for &p in &[104.5, 104.0, 103.5, 103.0, 102.0, 100.0] {
        levels.push(DxyLevel { price: p, level_type: LevelType::Support });
    }
    levels
}

#[derive(Debug, Clone)]
pub struct KeyLevelCrossing {
    pub level: DxyLevel,
    pub message: String,
}

/// Checks whether `current` crossed any level since `prev`: price moving
/// from below to at-or-above a resistance level, or from above to
/// at-or-below a support level.
pub fn check_crossings(levels: &[DxyLevel], prev: f64, current: f64) -> Vec<KeyLevelCrossing> {
    levels
        .iter()
        .filter_map(|level| match level.level_type {
            LevelType::Resistance if prev < level.price && level.price <= current => Some(KeyLevelCrossing {
                level: *level,
                message: format!("DXY broke above resistance at {:.1}, bearish for gold", level.price),
            }),
            LevelType::Support if prev > level.price && level.price >= current => Some(KeyLevelCrossing {
                level: *level,
                message: format!("DXY broke below support at {:.1}, bullish for gold", level.price),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaking_above_resistance_is_flagged() {
        let levels = default_levels();
        let crossings = check_crossings(&levels, 106.9, 107.1);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].level.price, 107.0);
    }

    #[test]
    fn staying_inside_a_range_is_not_flagged() {
        let levels = default_levels();
        assert!(check_crossings(&levels, 106.0, 106.2).is_empty());
    }

    #[test]
    fn breaking_below_support_is_flagged() {
        let levels = default_levels();
        let crossings = check_crossings(&levels, 103.6, 103.4);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].level.price, 103.5);
    }
}
