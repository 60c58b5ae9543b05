//! Typed request/reply shapes for the broker bridge protocol (spec §6, §9).
//!
//! Grounded on `original_source/backend/app/mt5/connector.py`: the same six
//! actions, the same per-action field sets, and the same permissive reply
//! parsing (`_parse_fill`'s "first present of several conventional keys").
//! The bridge itself — a real MT5 terminal or simulator on the other end —
//! is out of scope; this crate only models the message shapes.

use analysis_core::OrderSide;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action")]
pub enum BridgeRequest {
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "ACCOUNT_INFO")]
    AccountInfo,
    #[serde(rename = "GET_ORDERS")]
    GetOrders,
    #[serde(rename = "GET_POSITIONS")]
    GetPositions,
    #[serde(rename = "RATES")]
    Rates { symbol: String, timeframe: String, count: u32 },
    #[serde(rename = "SEND_ORDER")]
    SendOrder {
        symbol: String,
        #[serde(rename = "type")]
        side: OrderSide,
        volume: f64,
        sl: Option<f64>,
        tp: Option<f64>,
    },
}

/// One OHLCV row as returned by a `RATES` reply, before the caller attaches
/// the (symbol, timeframe) identity to build a `Candle`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRate {
    pub time_raw: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// A `RATES` reply carries the row list directly or nested under one of a
/// few conventional keys.
pub fn parse_rates(reply: &Value) -> Vec<RawRate> {
    let rows = reply
        .as_array()
        .or_else(|| reply.get("rates").and_then(Value::as_array))
        .or_else(|| reply.get("items").and_then(Value::as_array))
        .or_else(|| reply.get("data").and_then(Value::as_array));

    let Some(rows) = rows else { return Vec::new() };

    rows.iter()
        .filter_map(|row| {
            let time_raw = row
                .get("time")
                .or_else(|| row.get("timestamp"))
                .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|n| n.to_string())))?;
            let open = as_f64(row.get("open")?)?;
            let high = as_f64(row.get("high")?)?;
            let low = as_f64(row.get("low")?)?;
            let close = as_f64(row.get("close")?)?;
            let volume = row
                .get("tick_volume")
                .or_else(|| row.get("volume"))
                .and_then(as_f64)
                .unwrap_or(0.0);
            Some(RawRate { time_raw, open, high, low, close, volume })
        })
        .collect()
}

/// Extracts `(ticket, fill_price)` from a `SEND_ORDER` reply, matching
/// `_parse_fill`'s fallback chain of conventional key names.
pub fn parse_fill(reply: &Value) -> (Option<String>, Option<f64>) {
    let ticket = reply
        .get("ticket")
        .or_else(|| reply.get("order"))
        .or_else(|| reply.get("deal"))
        .or_else(|| reply.get("id"))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

    let fill_price = reply
        .get("fill_price")
        .or_else(|| reply.get("filled_price"))
        .or_else(|| reply.get("price"))
        .and_then(as_f64);

    (ticket, fill_price)
}

pub fn reply_error(reply: &Value) -> Option<String> {
    reply.get("error").map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// A single `GET_POSITIONS` row, normalized per spec §6 (minus the
/// account/sync identity, which is attached by the caller against the
/// active bridge connection).
#[derive(Debug, Clone)]
pub struct RawPosition {
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
    pub open_time_raw: String,
    pub magic: Option<i64>,
    pub comment: Option<String>,
}

pub fn parse_positions(reply: &Value) -> Vec<RawPosition> {
    let rows = reply
        .as_array()
        .or_else(|| reply.get("positions").and_then(Value::as_array))
        .or_else(|| reply.get("items").and_then(Value::as_array))
        .or_else(|| reply.get("data").and_then(Value::as_array));

    let Some(rows) = rows else { return Vec::new() };

    rows.iter()
        .filter_map(|row| {
            let ticket = row.get("ticket").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })?;
            let symbol = row.get("symbol").and_then(Value::as_str).unwrap_or_default().to_string();
            let side = match row.get("side").or_else(|| row.get("type")).and_then(Value::as_str)? {
                "BUY" | "buy" | "0" => OrderSide::Buy,
                _ => OrderSide::Sell,
            };
            let volume = as_f64(row.get("volume")?)?;
            let open_price = as_f64(row.get("open_price").or_else(|| row.get("price"))?)?;
            let sl = row.get("sl").and_then(as_f64);
            let tp = row.get("tp").and_then(as_f64);
            let profit = row.get("profit").and_then(as_f64).unwrap_or(0.0);
            let swap = row.get("swap").and_then(as_f64).unwrap_or(0.0);
            let commission = row.get("commission").and_then(as_f64).unwrap_or(0.0);
            let open_time_raw = row
                .get("open_time")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let magic = row.get("magic").and_then(Value::as_i64);
            let comment = row.get("comment").and_then(|v| v.as_str().map(str::to_string));

            Some(RawPosition {
                ticket,
                symbol,
                side,
                volume,
                open_price,
                sl,
                tp,
                profit,
                swap,
                commission,
                open_time_raw,
                magic,
                comment,
            })
        })
        .collect()
}

/// A single `GET_ORDERS` row — just enough to drive startup recovery
/// (cancel/requery stale in-flight orders before the scheduler's first tick).
#[derive(Debug, Clone)]
pub struct RawOrder {
    pub ticket: String,
    pub symbol: String,
    pub status: String,
}

pub fn parse_orders(reply: &Value) -> Vec<RawOrder> {
    let rows = reply
        .as_array()
        .or_else(|| reply.get("orders").and_then(Value::as_array))
        .or_else(|| reply.get("items").and_then(Value::as_array))
        .or_else(|| reply.get("data").and_then(Value::as_array));

    let Some(rows) = rows else { return Vec::new() };

    rows.iter()
        .filter_map(|row| {
            let ticket = row
                .get("ticket")
                .or_else(|| row.get("order"))
                .or_else(|| row.get("id"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })?;
            let symbol = row.get("symbol").and_then(Value::as_str).unwrap_or_default().to_string();
            let status = row.get("status").and_then(Value::as_str).unwrap_or("unknown").to_string();
            Some(RawOrder { ticket, symbol, status })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn send_order_serializes_with_action_tag() {
        let req = BridgeRequest::SendOrder {
            symbol: "XAUUSD".to_string(),
            side: OrderSide::Buy,
            volume: 0.1,
            sl: Some(1990.0),
            tp: Some(2010.0),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["action"], "SEND_ORDER");
        assert_eq!(v["symbol"], "XAUUSD");
        assert_eq!(v["type"], "BUY");
    }

    #[test]
    fn parse_fill_falls_back_through_key_names() {
        let reply = json!({"deal": 1234, "filled_price": "2001.5"});
        let (ticket, price) = parse_fill(&reply);
        assert_eq!(ticket.as_deref(), Some("1234"));
        assert_eq!(price, Some(2001.5));
    }

    #[test]
    fn parse_rates_reads_nested_list_under_conventional_key() {
        let reply = json!({"rates": [{"time": "2025-01-01T00:00:00Z", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "tick_volume": 10}]});
        let rows = parse_rates(&reply);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].volume, 10.0);
    }

    #[test]
    fn parse_rates_empty_when_no_recognized_shape() {
        let reply = json!({"unexpected": "shape"});
        assert!(parse_rates(&reply).is_empty());
    }

    #[test]
    fn parse_orders_reads_nested_list_under_conventional_key() {
        let reply = json!({"orders": [{"ticket": 99, "symbol": "XAUUSD", "status": "pending_new"}]});
        let rows = parse_orders(&reply);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticket, "99");
        assert_eq!(rows[0].status, "pending_new");
    }
}
