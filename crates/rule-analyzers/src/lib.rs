//! Component C: the five independent rule analyzers, each pure over a
//! candle window (plus, for Kill-Zone and DXY, a clock / already-fetched
//! context). The Signal Pipeline (component F) composes their outputs.

pub mod dxy_reader;
pub mod kill_zone;
pub mod price_action;
pub mod smc;
pub mod volume_profile;

use analysis_core::{Candle, DxyContext};
use chrono::{DateTime, Utc};

/// Combined output of all five analyzers for one candle window, as
/// consumed by the Signal Pipeline / Scorer.
#[derive(Debug, Clone)]
pub struct RuleAnalysis {
    pub smc: smc::SmcReport,
    pub volume_profile: Option<volume_profile::VolumeProfile>,
    pub price_action: price_action::PriceActionReport,
    pub kill_zone: kill_zone::KillZoneReport,
    pub dxy: Option<dxy_reader::DxyReading>,
}

/// Runs all five analyzers. `row_size` is the Volume Profile bucket width
/// (spec: "$1 for gold"-scale instruments); `dxy_context` is `None` when the
/// DXY service hasn't produced a context yet (startup, all providers down).
pub fn analyze(
    candles: &[Candle],
    now: DateTime<Utc>,
    row_size: f64,
    dxy_context: Option<&DxyContext>,
) -> RuleAnalysis {
    RuleAnalysis {
        smc: smc::analyze(candles),
        volume_profile: volume_profile::calculate(candles, row_size),
        price_action: price_action::analyze(candles),
        kill_zone: kill_zone::analyze(now),
        dxy: dxy_context.map(dxy_reader::read),
    }
}
