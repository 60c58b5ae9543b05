//! A single persistent request/reply connection to the broker bridge.
//!
//! Grounded on `original_source/backend/app/mt5/connector.py::MT5Connector`:
//! lazy connect-on-first-use, a single socket behind a lock (the bridge is
//! strict request/reply, one in flight — spec §9), and reconnect-on-error.
//! The original speaks ZeroMQ REQ/REP; this models the same one-at-a-time
//! discipline over a plain newline-delimited JSON TCP stream, per spec §6's
//! "single request/reply JSON channel over TCP".

use std::time::Duration;

use analysis_core::CoreError;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::protocol::BridgeRequest;

struct Connection {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

pub struct BridgeClient {
    host: Mutex<String>,
    port: Mutex<u16>,
    conn: Mutex<Option<Connection>>,
}

impl BridgeClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: Mutex::new(host.into()), port: Mutex::new(port), conn: Mutex::new(None) }
    }

    /// Re-points the client at a different bridge endpoint, dropping any
    /// live connection (mirrors `set_endpoint`'s reconnect-on-change).
    pub async fn set_endpoint(&self, host: impl Into<String>, port: u16) {
        let host = host.into();
        let mut cur_host = self.host.lock().await;
        let mut cur_port = self.port.lock().await;
        if *cur_host != host || *cur_port != port {
            *cur_host = host;
            *cur_port = port;
            *self.conn.lock().await = None;
        }
    }

    pub async fn connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    async fn connect(&self) -> Result<Connection, CoreError> {
        let host = self.host.lock().await.clone();
        let port = *self.port.lock().await;
        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| CoreError::BridgeError(format!("connect {host}:{port}: {e}")))?;
        let (read_half, writer) = stream.into_split();
        Ok(Connection { reader: BufReader::new(read_half), writer })
    }

    /// Sends one JSON request and waits at most `timeout_ms` for a reply.
    /// Reconnects and reports `mt5_not_connected`/the IO error as a reply
    /// object rather than propagating, mirroring `_call`'s always-return-a-
    /// dict contract — callers (the executor) branch on `reply_error`.
    pub async fn call(&self, request: &BridgeRequest, timeout_ms: u64) -> Value {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            match self.connect().await {
                Ok(c) => *guard = Some(c),
                Err(e) => return serde_json::json!({"error": e.to_string()}),
            }
        }

        let payload = match serde_json::to_string(request) {
            Ok(p) => p,
            Err(e) => return serde_json::json!({"error": format!("encode error: {e}")}),
        };

        let result = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            let conn = guard.as_mut().unwrap();
            conn.writer.write_all(payload.as_bytes()).await?;
            conn.writer.write_all(b"\n").await?;
            conn.writer.flush().await?;

            let mut line = String::new();
            conn.reader.read_line(&mut line).await?;
            Ok::<String, std::io::Error>(line)
        })
        .await;

        match result {
            Ok(Ok(line)) => serde_json::from_str(&line)
                .unwrap_or_else(|_| serde_json::json!({"error": "malformed bridge reply"})),
            Ok(Err(e)) => {
                *guard = None;
                serde_json::json!({"error": format!("bridge io error: {e}")})
            }
            Err(_) => {
                *guard = None;
                serde_json::json!({"error": "bridge timeout"})
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_endpoint_drops_connection_on_change() {
        let client = BridgeClient::new("localhost", 9000);
        client.set_endpoint("localhost", 9001).await;
        assert!(!client.connected().await);
    }

    #[tokio::test]
    async fn call_against_unreachable_host_reports_error_reply() {
        let client = BridgeClient::new("127.0.0.1", 1);
        let reply = client.call(&BridgeRequest::Ping, 200).await;
        assert!(reply.get("error").is_some());
    }
}
