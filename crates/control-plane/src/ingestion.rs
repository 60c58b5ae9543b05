//! Candle ingestion (the leaf of component K's `ingest_and_scan` job) plus
//! the `CandleStore` the Opportunity Scanner reads through.
//!
//! Grounded on `original_source/backend/app/mt5/connector.py`'s `RATES`
//! call and spec §5's ordering/idempotence guarantees: candles for a given
//! (symbol, timeframe) are inserted in time-ascending order, and
//! re-ingesting the same batch inserts nothing new (existence check on the
//! primary key tuple, done here as a batch `SELECT` against the time range
//! rather than one round-trip per row).

use std::collections::HashSet;
use std::sync::Arc;

use analysis_core::{Candle, CoreError, Timeframe};
use async_trait::async_trait;
use broker_bridge::{parse_rates, reply_error, BridgeClient, BridgeRequest, RawRate};
use chrono::{DateTime, TimeZone, Utc};
use opportunity_scanner::scanner::CandleStore;
use sqlx::AnyPool;

/// Parses the permissive timestamp shapes the bridge can hand back: a raw
/// integer (seconds or milliseconds since epoch, as either a JSON number or
/// a numeric string) or an RFC3339 string.
pub fn parse_bridge_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(n) = raw.parse::<i64>() {
        let seconds = if n.abs() > 10_000_000_000 { n / 1000 } else { n };
        return Utc.timestamp_opt(seconds, 0).single();
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

fn raw_rate_to_candle(symbol: &str, timeframe: Timeframe, raw: RawRate) -> Option<Candle> {
    let time = parse_bridge_timestamp(&raw.time_raw)?;
    let candle = Candle {
        symbol: symbol.to_string(),
        timeframe,
        time,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.volume,
    };
    candle.is_well_formed().then_some(candle)
}

pub struct Ingestor {
    bridge: Arc<BridgeClient>,
    pool: AnyPool,
    timeout_ms: u64,
}

impl Ingestor {
    pub fn new(bridge: Arc<BridgeClient>, pool: AnyPool, timeout_ms: u64) -> Self {
        Self { bridge, pool, timeout_ms }
    }

    /// One `RATES` round-trip plus an idempotent insert of whatever rows
    /// aren't already present. Returns the number of rows actually
    /// inserted (spec §8 invariant 1).
    pub async fn ingest(&self, symbol: &str, timeframe: Timeframe, count: u32) -> Result<usize, CoreError> {
        let request = BridgeRequest::Rates { symbol: symbol.to_string(), timeframe: timeframe.as_str().to_string(), count };
        let reply = self.bridge.call(&request, self.timeout_ms).await;
        if let Some(err) = reply_error(&reply) {
            return Err(CoreError::BridgeError(err));
        }

        let mut candles: Vec<Candle> = parse_rates(&reply)
            .into_iter()
            .filter_map(|raw| raw_rate_to_candle(symbol, timeframe, raw))
            .collect();
        candles.sort_by_key(|c| c.time);
        candles.dedup_by_key(|c| c.time);

        self.insert_new(symbol, timeframe, candles).await
    }

    async fn insert_new(&self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Result<usize, CoreError> {
        if candles.is_empty() {
            return Ok(0);
        }

        let min_time = candles.first().unwrap().time;
        let max_time = candles.last().unwrap().time;

        let existing: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT time FROM candles WHERE symbol = $1 AND timeframe = $2 AND time >= $3 AND time <= $4",
        )
        .bind(symbol)
        .bind(timeframe.as_str())
        .bind(min_time)
        .bind(max_time)
        .fetch_all(&self.pool)
        .await?;
        let existing: HashSet<DateTime<Utc>> = existing.into_iter().map(|(t,)| t).collect();

        let mut inserted = 0usize;
        let mut tx = self.pool.begin().await?;
        for candle in candles.iter().filter(|c| !existing.contains(&c.time)) {
            sqlx::query(
                "INSERT INTO candles (symbol, timeframe, time, open, high, low, close, volume)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
                 ON CONFLICT (symbol, timeframe, time) DO NOTHING",
            )
            .bind(&candle.symbol)
            .bind(candle.timeframe.as_str())
            .bind(candle.time)
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .bind(candle.volume)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }
        tx.commit().await?;

        Ok(inserted)
    }
}

#[async_trait]
impl CandleStore for Ingestor {
    async fn load_recent(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>, CoreError> {
        let rows: Vec<(String, String, DateTime<Utc>, f64, f64, f64, f64, f64)> = sqlx::query_as(
            "SELECT symbol, timeframe, time, open, high, low, close, volume FROM candles
             WHERE symbol = $1 AND timeframe = $2 ORDER BY time DESC LIMIT $3",
        )
        .bind(symbol)
        .bind(timeframe.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut candles: Vec<Candle> = rows
            .into_iter()
            .map(|(symbol, tf, time, open, high, low, close, volume)| Candle {
                symbol,
                timeframe: tf.parse().unwrap_or(timeframe),
                time,
                open,
                high,
                low,
                close,
                volume,
            })
            .collect();
        candles.reverse();
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epoch_seconds() {
        let ts = parse_bridge_timestamp("1700000000").unwrap();
        assert_eq!(ts.timestamp(), 1700000000);
    }

    #[test]
    fn parses_epoch_millis() {
        let ts = parse_bridge_timestamp("1700000000000").unwrap();
        assert_eq!(ts.timestamp(), 1700000000);
    }

    #[test]
    fn parses_rfc3339() {
        let ts = parse_bridge_timestamp("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.timestamp(), 1704067200);
    }

    #[test]
    fn rejects_malformed_candle_body() {
        let candle = raw_rate_to_candle(
            "XAUUSD",
            Timeframe::M15,
            RawRate { time_raw: "1700000000".to_string(), open: 10.0, high: 5.0, low: 1.0, close: 10.0, volume: 1.0 },
        );
        assert!(candle.is_none(), "high below open/close must be rejected");
    }
}
