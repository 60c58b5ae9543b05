//! The `SignalSink` the Opportunity Scanner persists scored candidates
//! through, one DB transaction per batch (spec §4.G: "a scan's signals are
//! committed as one unit, not row by row").

use analysis_core::{CoreError, TradingSignal};
use async_trait::async_trait;
use opportunity_scanner::scanner::SignalSink;
use sqlx::AnyPool;

pub struct DbSignalSink {
    pool: AnyPool,
}

impl DbSignalSink {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SignalSink for DbSignalSink {
    async fn persist_batch(&self, signals: &[TradingSignal]) -> Result<(), CoreError> {
        if signals.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for signal in signals {
            sqlx::query(
                "INSERT INTO trading_signals
                 (user_id, source, symbol, timeframe, action, confidence, score,
                  entry_price, suggested_sl, suggested_tp, reasons, context, created_at)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
            )
            .bind(signal.user_id)
            .bind(signal.source.as_str())
            .bind(&signal.symbol)
            .bind(signal.timeframe.as_str())
            .bind(signal.action.as_str())
            .bind(signal.confidence)
            .bind(signal.score)
            .bind(signal.entry_price)
            .bind(signal.suggested_sl)
            .bind(signal.suggested_tp)
            .bind(serde_json::to_string(&signal.reasons).unwrap_or_default())
            .bind(&signal.context)
            .bind(signal.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }
}
