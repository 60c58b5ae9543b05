//! Component K's `scanner_auto_select` job: picks the best fresh scanner
//! candidate, runs it through the Selection Policy's thrashing guard and the
//! Execution Governance pre-trade gate, and — if both allow it — executes.
//!
//! Grounded on `original_source/backend/app/scanner/scanner_tasks.py::
//! _run_auto_select_once`: load the best-scoring recent scanner signal,
//! gate on governance, gate on the selection policy (keyed by
//! `symbol:timeframe` standing in for the original's single strategy slot,
//! since the scanner ranges over many symbols), then execute through the
//! same executor path a manual trade would use.

use std::sync::Arc;
use std::sync::Mutex;

use analysis_core::{CoreError, SignalAction, SignalSource, Timeframe};
use broker_bridge::BridgeClient;
use chrono::{DateTime, Duration, Utc};
use execution_governance::settings;
use order_executor::{ExecuteRequest, OrderExecutor};
use signal_scorer::SelectionPolicyState;
use sqlx::AnyPool;

#[derive(sqlx::FromRow)]
struct CandidateRow {
    symbol: String,
    timeframe: String,
    action: String,
    score: f64,
    entry_price: f64,
    suggested_sl: Option<f64>,
    suggested_tp: Option<f64>,
}

pub struct AutoSelector {
    pool: AnyPool,
    bridge: Arc<BridgeClient>,
    executor: Arc<OrderExecutor>,
    policy: Mutex<SelectionPolicyState>,
}

impl AutoSelector {
    pub fn new(pool: AnyPool, bridge: Arc<BridgeClient>, executor: Arc<OrderExecutor>, cooldown_seconds: i64, hysteresis_delta: f64) -> Self {
        Self { pool, bridge, executor, policy: Mutex::new(SelectionPolicyState::new(cooldown_seconds, hysteresis_delta)) }
    }

    async fn best_candidate(&self, min_score: f64, min_confidence: f64, max_age_min: i64) -> Result<Option<CandidateRow>, CoreError> {
        let since = Utc::now() - Duration::minutes(max_age_min);
        let row = sqlx::query_as::<_, CandidateRow>(
            "SELECT symbol, timeframe, action, score, entry_price, suggested_sl, suggested_tp
             FROM trading_signals
             WHERE source = $1 AND created_at >= $2 AND score >= $3 AND confidence >= $4
             ORDER BY score DESC LIMIT 1",
        )
        .bind(SignalSource::Scanner.as_str())
        .bind(since)
        .bind(min_score)
        .bind(min_confidence)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn run_once(&self) -> anyhow::Result<()> {
        let min_score = settings::get_f64(&self.pool, "AUTO_SELECT_MIN_SCORE", 55.0).await;
        let min_confidence = settings::get_f64(&self.pool, "AUTO_SELECT_MIN_CONFIDENCE", 60.0).await;
        let max_age_min = settings::get_i64(&self.pool, "AUTO_SELECT_MAX_SIGNAL_AGE_MIN", 30).await;
        let volume = settings::get_f64(&self.pool, "AUTO_SELECT_TRADE_VOLUME", 0.1).await;

        let Some(candidate) = self.best_candidate(min_score, min_confidence, max_age_min).await? else {
            tracing::debug!("auto-select: no candidate above threshold");
            return Ok(());
        };

        let action: SignalAction = candidate.action.parse()?;
        let side = match action {
            SignalAction::Buy | SignalAction::StrongBuy => analysis_core::OrderSide::Buy,
            SignalAction::Sell | SignalAction::StrongSell => analysis_core::OrderSide::Sell,
            SignalAction::Neutral | SignalAction::Wait => {
                tracing::debug!(symbol = %candidate.symbol, "auto-select: best candidate isn't actionable");
                return Ok(());
            }
        };

        let decision = execution_governance::pre_trade_gate(&self.pool, SignalSource::Scanner, self.bridge.connected().await, true).await?;
        if !decision.allow {
            if let Some(reason) = &decision.reason {
                tracing::info!(reason, "auto-select blocked by governance");
            }
            return Ok(());
        }

        let timeframe: Timeframe = candidate.timeframe.parse().unwrap_or(Timeframe::M15);
        let strategy_key = format!("{}:{}", candidate.symbol, timeframe.as_str());
        let now: DateTime<Utc> = Utc::now();

        let allowed = {
            let policy = self.policy.lock().expect("selection policy mutex poisoned");
            policy.allow(now, &strategy_key, candidate.score)
        };
        if !allowed {
            tracing::debug!(strategy = %strategy_key, "auto-select blocked by selection policy");
            return Ok(());
        }

        let request = ExecuteRequest {
            source: SignalSource::Scanner,
            user_id: None,
            symbol: candidate.symbol.clone(),
            side,
            volume,
            sl: candidate.suggested_sl,
            tp: candidate.suggested_tp,
            requested_price: Some(candidate.entry_price),
        };

        let event = self.executor.execute(request).await?;
        if !event.status.is_violation() {
            let mut policy = self.policy.lock().expect("selection policy mutex poisoned");
            policy.commit(now, &strategy_key, candidate.score);
        }

        tracing::info!(symbol = %candidate.symbol, status = event.status.as_str(), "auto-select executed candidate");
        Ok(())
    }
}
