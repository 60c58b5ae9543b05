//! Startup recovery and position syncing against the broker bridge (the
//! original_source supplement spec §9 notes as dropped by the distillation:
//! "cancel/requery stale orders via GET_ORDERS before the scheduler's first
//! tick").
//!
//! Grounded on `original_source/backend/app/mt5/reconciler.py`: at process
//! start, fetch open orders and log anything not in a terminal state so an
//! operator notices a stale order surviving a restart (the original cancels
//! them outright; this logs for the operator rather than auto-cancelling,
//! since the bridge's `action` vocabulary spec §6 defines has no cancel
//! verb to issue). Position snapshots are upserted from `GET_POSITIONS` on
//! the same cadence as the DXY refresh job, and double as the P&L input the
//! predictive job reads.

use std::sync::Arc;

use analysis_core::CoreError;
use broker_bridge::{parse_orders, parse_positions, reply_error, BridgeClient, BridgeRequest};
use chrono::Utc;
use sqlx::AnyPool;

use crate::ingestion::parse_bridge_timestamp;

const TERMINAL_STATUSES: &[&str] = &["filled", "cancelled", "canceled", "rejected", "closed", "done"];

/// Fetches open orders and logs any not in a terminal state. Read-only: the
/// bridge protocol has no cancel action, so recovery here is observability,
/// not an automatic cancel.
pub async fn recover_stale_orders(bridge: &BridgeClient, timeout_ms: u64) -> anyhow::Result<()> {
    let reply = bridge.call(&BridgeRequest::GetOrders, timeout_ms).await;
    if let Some(err) = reply_error(&reply) {
        anyhow::bail!("GET_ORDERS failed during startup recovery: {err}");
    }

    let orders = parse_orders(&reply);
    let stale: Vec<_> = orders
        .iter()
        .filter(|o| !TERMINAL_STATUSES.contains(&o.status.to_ascii_lowercase().as_str()))
        .collect();

    if stale.is_empty() {
        tracing::info!("startup recovery: no stale orders found");
    } else {
        for order in &stale {
            tracing::warn!(
                ticket = %order.ticket,
                symbol = %order.symbol,
                status = %order.status,
                "stale order survived restart, needs manual attention"
            );
        }
    }

    Ok(())
}

pub struct PositionSync {
    bridge: Arc<BridgeClient>,
    pool: AnyPool,
    account_id: String,
    timeout_ms: u64,
}

impl PositionSync {
    pub fn new(bridge: Arc<BridgeClient>, pool: AnyPool, account_id: String, timeout_ms: u64) -> Self {
        Self { bridge, pool, account_id, timeout_ms }
    }

    pub async fn sync_once(&self) -> anyhow::Result<()> {
        let reply = self.bridge.call(&BridgeRequest::GetPositions, self.timeout_ms).await;
        if let Some(err) = reply_error(&reply) {
            anyhow::bail!("GET_POSITIONS failed: {err}");
        }

        let positions = parse_positions(&reply);
        let now = Utc::now();

        for p in positions {
            let open_time = parse_bridge_timestamp(&p.open_time_raw).unwrap_or(now);
            self.upsert(&p, open_time, now).await?;
        }

        Ok(())
    }

    async fn upsert(
        &self,
        p: &broker_bridge::RawPosition,
        open_time: chrono::DateTime<Utc>,
        synced_at: chrono::DateTime<Utc>,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO mt5_position_snapshots
             (account_id, ticket, symbol, side, volume, open_price, sl, tp, profit, swap,
              commission, open_time, magic, comment, synced_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
             ON CONFLICT (account_id, ticket) DO UPDATE SET
                volume = EXCLUDED.volume,
                sl = EXCLUDED.sl,
                tp = EXCLUDED.tp,
                profit = EXCLUDED.profit,
                swap = EXCLUDED.swap,
                commission = EXCLUDED.commission,
                synced_at = EXCLUDED.synced_at",
        )
        .bind(&self.account_id)
        .bind(&p.ticket)
        .bind(&p.symbol)
        .bind(p.side.as_str())
        .bind(p.volume)
        .bind(p.open_price)
        .bind(p.sl)
        .bind(p.tp)
        .bind(p.profit)
        .bind(p.swap)
        .bind(p.commission)
        .bind(open_time)
        .bind(p.magic)
        .bind(&p.comment)
        .bind(synced_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
