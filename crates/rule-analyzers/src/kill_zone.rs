//! Kill-Zone Clock sub-analyzer (spec §4.C).
//!
//! Grounded on `original_source/backend/app/strategies/kill_zones.py`: the
//! session windows, volatility/liquidity ratings, and the London/NY overlap
//! taking precedence over its two parent sessions are copied exactly. All
//! times are GMT/UTC.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    Asian,
    London,
    NewYork,
    LondonNyOverlap,
    OffHours,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Asian => "asian",
            Session::London => "london",
            Session::NewYork => "new_york",
            Session::LondonNyOverlap => "london_ny_overlap",
            Session::OffHours => "off_hours",
        }
    }
}

struct ZoneSpec {
    session: Session,
    start_hour: u32,
    end_hour: u32,
    volatility_rating: u8,
    liquidity_rating: u8,
    recommended: bool,
}

/// Windows in start/end GMT hour, checked in this order: the overlap is
/// tested first so it wins over its two parent sessions.
const ZONES: &[ZoneSpec] = &[
    ZoneSpec {
        session: Session::LondonNyOverlap,
        start_hour: 13,
        end_hour: 16,
        volatility_rating: 5,
        liquidity_rating: 5,
        recommended: true,
    },
    ZoneSpec {
        session: Session::Asian,
        start_hour: 0,
        end_hour: 8,
        volatility_rating: 2,
        liquidity_rating: 2,
        recommended: false,
    },
    ZoneSpec {
        session: Session::London,
        start_hour: 7,
        end_hour: 16,
        volatility_rating: 4,
        liquidity_rating: 4,
        recommended: true,
    },
    ZoneSpec {
        session: Session::NewYork,
        start_hour: 13,
        end_hour: 21,
        volatility_rating: 4,
        liquidity_rating: 5,
        recommended: true,
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillZoneReport {
    pub can_trade: bool,
    pub session: Session,
    pub volatility_rating: u8,
    pub liquidity_rating: u8,
    pub reasons: Vec<String>,
}

fn in_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

fn current_zone(hour: u32) -> &'static ZoneSpec {
    ZONES
        .iter()
        .find(|z| in_window(hour, z.start_hour, z.end_hour))
        .unwrap_or(&ZoneSpec {
            session: Session::OffHours,
            start_hour: 21,
            end_hour: 0,
            volatility_rating: 1,
            liquidity_rating: 1,
            recommended: false,
        })
}

/// Pure function of UTC time: `can_trade = recommended session && liquidity
/// rating >= 4`, matching `kill_zones.py::should_trade` exactly.
pub fn analyze(now: DateTime<Utc>) -> KillZoneReport {
    let hour = now.hour();
    let zone = current_zone(hour);

    let can_trade = zone.recommended && zone.liquidity_rating >= 4;

    let mut reasons = Vec::new();
    reasons.push(format!("session={}", zone.session.as_str()));
    if !zone.recommended {
        reasons.push("session not recommended for trading".to_string());
    }
    if zone.liquidity_rating < 4 {
        reasons.push(format!("liquidity_rating {} below 4", zone.liquidity_rating));
    }

    KillZoneReport {
        can_trade,
        session: zone.session,
        volatility_rating: zone.volatility_rating,
        liquidity_rating: zone.liquidity_rating,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 30, hour, 0, 0).unwrap()
    }

    #[test]
    fn overlap_wins_over_london_and_new_york() {
        let report = analyze(at_hour(14));
        assert_eq!(report.session, Session::LondonNyOverlap);
        assert_eq!(report.liquidity_rating, 5);
        assert!(report.can_trade);
    }

    #[test]
    fn london_session_is_tradeable() {
        let report = analyze(at_hour(9));
        assert_eq!(report.session, Session::London);
        assert!(report.can_trade);
    }

    #[test]
    fn asian_session_liquidity_too_low() {
        let report = analyze(at_hour(2));
        assert_eq!(report.session, Session::Asian);
        assert!(!report.can_trade);
    }

    #[test]
    fn off_hours_blocks_trading() {
        let report = analyze(at_hour(22));
        assert_eq!(report.session, Session::OffHours);
        assert!(!report.can_trade);
    }

    #[test]
    fn new_york_after_overlap_still_tradeable() {
        let report = analyze(at_hour(18));
        assert_eq!(report.session, Session::NewYork);
        assert!(report.can_trade);
    }
}
