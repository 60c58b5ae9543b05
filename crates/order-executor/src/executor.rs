//! Component I: the Executor.
//!
//! Grounded on `original_source/backend/app/execution/executor.py::
//! ExecutionExecutor.execute`: the paper/simulated short-circuit, latency
//! measurement around the bridge call, slippage computed from side, the
//! latency/slippage guards producing `blocked`, and persisting one
//! `ExecutionEvent` per attempt. Retries on temporary bridge errors are
//! spec §4.I's addition (the original makes a single attempt); each retry
//! is its own event, and any successful attempt ends the loop.

use std::sync::Arc;
use std::time::Instant;

use analysis_core::{CoreError, ExecutionEvent, ExecutionStatus, OrderSide, SignalSource};
use broker_bridge::{parse_fill, reply_error, BridgeClient, BridgeRequest};
use chrono::Utc;
use execution_governance::settings;
use sqlx::AnyPool;

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub source: SignalSource,
    pub user_id: Option<i64>,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    pub requested_price: Option<f64>,
}

fn calc_slippage(side: OrderSide, requested: Option<f64>, filled: Option<f64>) -> Option<f64> {
    match (requested, filled) {
        (Some(r), Some(f)) => Some(match side {
            OrderSide::Buy => f - r,
            OrderSide::Sell => r - f,
        }),
        _ => None,
    }
}

/// Distinguishes a transport-level hiccup (worth retrying) from a rejection
/// the bridge itself reported (not worth retrying).
fn is_temporary_bridge_error(msg: &str) -> bool {
    msg.contains("bridge timeout") || msg.contains("bridge io error") || msg.contains("mt5_not_connected") || msg.contains("connect ")
}

pub struct OrderExecutor {
    bridge: Arc<BridgeClient>,
    pool: AnyPool,
}

impl OrderExecutor {
    pub fn new(bridge: Arc<BridgeClient>, pool: AnyPool) -> Self {
        Self { bridge, pool }
    }

    pub async fn execute(&self, req: ExecuteRequest) -> Result<ExecutionEvent, CoreError> {
        let mode = settings::get_string(&self.pool, "TRADING_MODE").await.unwrap_or_else(|| "paper".to_string());
        let bridge_name = settings::get_string(&self.pool, "EXECUTION_BRIDGE").await.unwrap_or_else(|| "simulated".to_string());

        if mode.to_ascii_lowercase() != "live" || bridge_name.to_ascii_lowercase() != "mt5_zmq" {
            let event = self.simulated_event(&req, &mode, &bridge_name);
            self.persist(&event).await?;
            return Ok(event);
        }

        let max_retries = settings::get_i64(&self.pool, "MT5_ORDER_RETRIES", 1).await.max(1);
        let timeout_ms = settings::get_i64(&self.pool, "EXEC_TIMEOUT_MS", 2000).await as u64;
        let max_latency_ms = settings::get_f64(&self.pool, "EXEC_MAX_LATENCY_MS", 1500.0).await;
        let max_slippage = settings::get_f64(&self.pool, "EXEC_MAX_SLIPPAGE", 2.5).await;

        let mut last_event = None;
        for attempt in 1..=max_retries {
            let event = self
                .live_attempt(&req, timeout_ms, max_latency_ms, max_slippage)
                .await?;
            self.persist(&event).await?;

            let retry_worthy = matches!(event.status, ExecutionStatus::Error)
                && event.error.as_deref().map(is_temporary_bridge_error).unwrap_or(false);

            let is_final = event.status != ExecutionStatus::Error || !retry_worthy || attempt == max_retries;
            last_event = Some(event);
            if is_final {
                break;
            }
            tracing::warn!(attempt, symbol = %req.symbol, "temporary bridge error, retrying order");
        }

        let event = last_event.expect("loop runs at least once");
        if event.status.is_violation() {
            let (_, reason) = execution_governance::post_trade_update(&self.pool, true, event.error.as_deref()).await?;
            if let Some(reason) = reason {
                tracing::warn!(reason = %reason, "automation disabled after execution violation");
            }
        }

        Ok(event)
    }

    fn simulated_event(&self, req: &ExecuteRequest, mode: &str, bridge_name: &str) -> ExecutionEvent {
        ExecutionEvent {
            id: None,
            created_at: Utc::now(),
            user_id: req.user_id,
            source: req.source,
            symbol: req.symbol.clone(),
            side: req.side,
            volume: req.volume,
            requested_price: req.requested_price,
            sl: req.sl,
            tp: req.tp,
            status: ExecutionStatus::Simulated,
            ticket: None,
            fill_price: None,
            slippage: None,
            latency_ms: None,
            bridge_connected: false,
            error: None,
            request: serde_json::json!({"mode": mode, "bridge": bridge_name}),
            response: serde_json::json!({"note": "simulated execution"}),
        }
    }

    async fn live_attempt(
        &self,
        req: &ExecuteRequest,
        timeout_ms: u64,
        max_latency_ms: f64,
        max_slippage: f64,
    ) -> Result<ExecutionEvent, CoreError> {
        let request = BridgeRequest::SendOrder {
            symbol: req.symbol.clone(),
            side: req.side,
            volume: req.volume,
            sl: req.sl,
            tp: req.tp,
        };
        let request_json = serde_json::to_value(&request).unwrap_or(serde_json::Value::Null);

        let t0 = Instant::now();
        let reply = self.bridge.call(&request, timeout_ms).await;
        let latency_ms = t0.elapsed().as_secs_f64() * 1000.0;
        let bridge_connected = self.bridge.connected().await;

        if let Some(err) = reply_error(&reply) {
            return Ok(ExecutionEvent {
                id: None,
                created_at: Utc::now(),
                user_id: req.user_id,
                source: req.source,
                symbol: req.symbol.clone(),
                side: req.side,
                volume: req.volume,
                requested_price: req.requested_price,
                sl: req.sl,
                tp: req.tp,
                status: ExecutionStatus::Error,
                ticket: None,
                fill_price: None,
                slippage: None,
                latency_ms: Some(latency_ms as i64),
                bridge_connected,
                error: Some(err),
                request: request_json,
                response: reply,
            });
        }

        let (ticket, fill_price) = parse_fill(&reply);
        let slippage = calc_slippage(req.side, req.requested_price, fill_price);

        let (status, error) = if latency_ms > max_latency_ms {
            (ExecutionStatus::Blocked, Some(format!("latency_ms={latency_ms:.0} > max={max_latency_ms:.0}")))
        } else if slippage.map(|s| s.abs() > max_slippage).unwrap_or(false) {
            (ExecutionStatus::Blocked, Some(format!("slippage={:.2} > max={max_slippage:.2}", slippage.unwrap())))
        } else {
            (ExecutionStatus::Success, None)
        };

        Ok(ExecutionEvent {
            id: None,
            created_at: Utc::now(),
            user_id: req.user_id,
            source: req.source,
            symbol: req.symbol.clone(),
            side: req.side,
            volume: req.volume,
            requested_price: req.requested_price,
            sl: req.sl,
            tp: req.tp,
            status,
            ticket,
            fill_price,
            slippage,
            latency_ms: Some(latency_ms as i64),
            bridge_connected,
            error,
            request: request_json,
            response: reply,
        })
    }

    async fn persist(&self, event: &ExecutionEvent) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO execution_events
             (created_at, user_id, source, symbol, side, volume, requested_price, sl, tp,
              status, ticket, fill_price, slippage, latency_ms, bridge_connected, error, request, response)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)",
        )
        .bind(event.created_at)
        .bind(event.user_id)
        .bind(event.source.as_str())
        .bind(&event.symbol)
        .bind(event.side.as_str())
        .bind(event.volume)
        .bind(event.requested_price)
        .bind(event.sl)
        .bind(event.tp)
        .bind(event.status.as_str())
        .bind(&event.ticket)
        .bind(event.fill_price)
        .bind(event.slippage)
        .bind(event.latency_ms)
        .bind(event.bridge_connected)
        .bind(&event.error)
        .bind(&event.request)
        .bind(&event.response)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_sign_follows_side() {
        assert_eq!(calc_slippage(OrderSide::Buy, Some(2000.0), Some(2001.0)), Some(1.0));
        assert_eq!(calc_slippage(OrderSide::Sell, Some(2000.0), Some(1999.0)), Some(1.0));
    }

    #[test]
    fn slippage_is_none_without_both_prices() {
        assert_eq!(calc_slippage(OrderSide::Buy, None, Some(2001.0)), None);
    }

    #[test]
    fn bridge_timeout_is_retry_worthy() {
        assert!(is_temporary_bridge_error("bridge timeout"));
        assert!(!is_temporary_bridge_error("insufficient margin"));
    }
}
