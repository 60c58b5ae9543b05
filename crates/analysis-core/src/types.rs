use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar for a (symbol, timeframe) at a given time.
///
/// Invariant: `low <= min(open, close) <= max(open, close) <= high`. Never
/// mutated once ingested; uniquely identified by (symbol, timeframe, time).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn is_well_formed(&self) -> bool {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        self.low <= body_low && body_high <= self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "M1" => Ok(Timeframe::M1),
            "M5" => Ok(Timeframe::M5),
            "M15" => Ok(Timeframe::M15),
            "M30" => Ok(Timeframe::M30),
            "H1" => Ok(Timeframe::H1),
            "H4" => Ok(Timeframe::H4),
            "D1" | "DAILY" => Ok(Timeframe::D1),
            other => Err(crate::CoreError::InvalidData(format!(
                "unknown timeframe {other}"
            ))),
        }
    }
}

/// Derived, immutable feature snapshot over the trailing window of a
/// (symbol, timeframe) candle series. Any field is `None` when its window
/// isn't satisfied by the input length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub last_close: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub ema_spread: Option<f64>,
    pub atr: Option<f64>,
    pub atr_pct: Option<f64>,
    pub bb_width: Option<f64>,
    pub n_bars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimePrimary {
    TrendUp,
    TrendDown,
    Range,
    HighVolatility,
    LowLiquidity,
}

impl RegimePrimary {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegimePrimary::TrendUp => "trend_up",
            RegimePrimary::TrendDown => "trend_down",
            RegimePrimary::Range => "range",
            RegimePrimary::HighVolatility => "high_volatility",
            RegimePrimary::LowLiquidity => "low_liquidity",
        }
    }
}

/// Coarse market-behavior classification for one (symbol, timeframe) sample.
/// Derived per analysis call; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRegime {
    pub primary: RegimePrimary,
    pub tags: HashMap<String, bool>,
    pub confidence: f64,
    pub reasons: HashMap<String, f64>,
}

impl MarketRegime {
    pub fn tag(&self, name: &str) -> bool {
        self.tags.get(name).copied().unwrap_or(false)
    }
}

/// Output of the Scorer (component E): component-weighted total plus the
/// reasons an operator can audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total: f64,
    pub components: HashMap<String, f64>,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Buy,
    Sell,
    Neutral,
    Wait,
    StrongBuy,
    StrongSell,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Neutral => "NEUTRAL",
            SignalAction::Wait => "WAIT",
            SignalAction::StrongBuy => "STRONG_BUY",
            SignalAction::StrongSell => "STRONG_SELL",
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            SignalAction::Buy | SignalAction::Sell | SignalAction::StrongBuy | SignalAction::StrongSell
        )
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, SignalAction::Buy | SignalAction::StrongBuy)
    }

    /// Integer score in [-100, 100] maps to an action band per spec §4.F:
    /// |score| >= 60 -> STRONG_*, >= 40 -> BUY/SELL, else NEUTRAL.
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 60 => SignalAction::StrongBuy,
            s if s >= 40 => SignalAction::Buy,
            s if s <= -60 => SignalAction::StrongSell,
            s if s <= -40 => SignalAction::Sell,
            _ => SignalAction::Neutral,
        }
    }
}

impl std::str::FromStr for SignalAction {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(SignalAction::Buy),
            "SELL" => Ok(SignalAction::Sell),
            "NEUTRAL" => Ok(SignalAction::Neutral),
            "WAIT" => Ok(SignalAction::Wait),
            "STRONG_BUY" => Ok(SignalAction::StrongBuy),
            "STRONG_SELL" => Ok(SignalAction::StrongSell),
            other => Err(crate::CoreError::InvalidData(format!(
                "unknown signal action {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    Engine,
    Scanner,
    Webhook,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Engine => "engine",
            SignalSource::Scanner => "scanner",
            SignalSource::Webhook => "webhook",
        }
    }
}

impl std::str::FromStr for SignalSource {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "engine" => Ok(SignalSource::Engine),
            "scanner" => Ok(SignalSource::Scanner),
            "webhook" => Ok(SignalSource::Webhook),
            other => Err(crate::CoreError::InvalidData(format!(
                "unknown signal source {other}"
            ))),
        }
    }
}

/// A scored trading recommendation for one (symbol, timeframe). Persisted by
/// the Opportunity Scanner (component G); also produced ad hoc by the Signal
/// Pipeline (component F) for callers that don't go through the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub source: SignalSource,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub action: SignalAction,
    /// 0..100 scale (spec: "confidence in [0,1]*100 scale")
    pub confidence: f64,
    pub score: f64,
    pub entry_price: f64,
    pub suggested_sl: Option<f64>,
    pub suggested_tp: Option<f64>,
    pub reasons: Vec<String>,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TradingSignal {
    /// Invariant check from spec §3: SL and entry are on opposite sides of
    /// TP for BUY/SELL-class actions.
    pub fn has_consistent_levels(&self) -> bool {
        if !self.action.is_actionable() {
            return true;
        }
        match (self.suggested_sl, self.suggested_tp) {
            (Some(sl), Some(tp)) => {
                if self.action.is_bullish() {
                    sl < self.entry_price && tp > self.entry_price
                } else {
                    sl > self.entry_price && tp < self.entry_price
                }
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    XgBoost,
    LightGbm,
    Lstm,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::XgBoost => "xgboost",
            ModelType::LightGbm => "lightgbm",
            ModelType::Lstm => "lstm",
        }
    }
}

/// A registered, versioned model artifact. At most one row is `is_active` per
/// (model_type, symbol, timeframe); new active rows atomically deactivate the
/// previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegistryEntry {
    pub id: Option<i64>,
    pub model_type: ModelType,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub version: String,
    pub artifact_path: String,
    pub metrics: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Simulated,
    Success,
    Blocked,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Simulated => "simulated",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Blocked => "blocked",
            ExecutionStatus::Error => "error",
        }
    }

    /// Treated as a governance "violation" by component H, matching spec
    /// §4.H's "on a violation (blocked/bad event)" wording literally rather
    /// than the original source's narrower "bad" status string.
    pub fn is_violation(&self) -> bool {
        matches!(self, ExecutionStatus::Blocked | ExecutionStatus::Error)
    }
}

/// Append-only execution attempt record. Every order attempt (including
/// retries) produces exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub source: SignalSource,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub requested_price: Option<f64>,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    pub status: ExecutionStatus,
    pub ticket: Option<String>,
    pub fill_price: Option<f64>,
    pub slippage: Option<f64>,
    pub latency_ms: Option<i64>,
    pub bridge_connected: bool,
    pub error: Option<String>,
    pub request: serde_json::Value,
    pub response: serde_json::Value,
}

/// Latest broker-side position snapshot per (account_id, ticket). Upserted on
/// sync; never removed by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mt5PositionSnapshot {
    pub account_id: String,
    pub ticket: String,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub open_price: f64,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    pub profit: f64,
    pub swap: f64,
    pub commission: f64,
    pub open_time: DateTime<Utc>,
    pub magic: Option<i64>,
    pub comment: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// A row in the settings control surface (§6). `is_secret` rows are never
/// logged in full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
}

/// Walk-forward / monte-carlo quality report used by Execution Governance as
/// an automation gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictiveReport {
    pub id: Option<i64>,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub wf_sharpe: f64,
    pub wf_winrate: f64,
    pub wf_avg_return: f64,
    pub mc_max_dd: f64,
    pub mc_var_95: f64,
    pub drift_score: f64,
    pub stability_score: f64,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PredictiveReport {
    /// Exact formula from `original_source/app/predictive/service.py`
    /// (spec §9 Open Question #2): preserved precisely; the gate threshold
    /// it's compared against stays operator-configured.
    pub fn compute_stability_score(
        wf_sharpe: f64,
        wf_winrate: f64,
        wf_avg_return: f64,
        mc_max_dd: f64,
        drift_score: f64,
    ) -> f64 {
        wf_sharpe * 25.0 + wf_winrate * 100.0 + wf_avg_return * 10.0 - mc_max_dd.abs() * 0.5
            - drift_score * 50.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DxyImpact {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DxyStrength {
    Low,
    Moderate,
    Strong,
}

/// Cached-with-TTL context maintained exclusively by the DXY service
/// (component J); read by the Rule Analyzers and Scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DxyContext {
    pub provider: String,
    pub symbol: String,
    pub current_dxy: f64,
    pub impact: DxyImpact,
    pub strength: DxyStrength,
    pub corr_rolling: Option<f64>,
    pub corr_strength: Option<DxyStrength>,
    pub updated_at: DateTime<Utc>,
}

/// Transient operational event forwarded by the Activity Bus. Never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
    pub timestamp_ms: i64,
}
