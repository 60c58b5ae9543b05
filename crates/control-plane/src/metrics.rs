//! Rolling execution metrics (SPEC_FULL.md's metrics/heartbeat supplement).
//!
//! Grounded directly on `trading-agent/src/metrics.rs::AgentMetrics`: the
//! same per-cycle timers, aggregate counters, and a rolling 20-trade window
//! for win rate, adapted from an equities scan/gate/execute cycle to this
//! core's ingest/scan/auto-select/execute cycle.

use std::collections::VecDeque;
use std::time::Instant;

pub struct CoreMetrics {
    pub cycles_run: u64,
    pub signals_generated: u64,
    pub signals_filtered: u64,
    pub trades_executed: u64,
    pub trades_failed: u64,

    pub last_scan_duration_ms: u64,
    pub last_auto_select_duration_ms: u64,
    pub last_total_duration_ms: u64,

    recent_trades: VecDeque<bool>,
    log_interval_cycles: u64,
}

impl CoreMetrics {
    pub fn new(log_interval_cycles: u64) -> Self {
        Self {
            cycles_run: 0,
            signals_generated: 0,
            signals_filtered: 0,
            trades_executed: 0,
            trades_failed: 0,
            last_scan_duration_ms: 0,
            last_auto_select_duration_ms: 0,
            last_total_duration_ms: 0,
            recent_trades: VecDeque::with_capacity(20),
            log_interval_cycles,
        }
    }

    pub fn start_timer() -> Instant {
        Instant::now()
    }

    pub fn record_scan_duration(&mut self, start: Instant) {
        self.last_scan_duration_ms = start.elapsed().as_millis() as u64;
    }

    pub fn record_auto_select_duration(&mut self, start: Instant) {
        self.last_auto_select_duration_ms = start.elapsed().as_millis() as u64;
    }

    pub fn record_trade_result(&mut self, won: bool) {
        self.recent_trades.push_back(won);
        if self.recent_trades.len() > 20 {
            self.recent_trades.pop_front();
        }
    }

    pub fn finish_cycle(&mut self, cycle_start: Instant) {
        self.last_total_duration_ms = cycle_start.elapsed().as_millis() as u64;
        self.cycles_run += 1;
        if self.log_interval_cycles > 0 && self.cycles_run.is_multiple_of(self.log_interval_cycles) {
            self.log_metrics();
        }
    }

    /// Rolling win rate from the last 20 executions (0-100%).
    pub fn recent_win_rate(&self) -> f64 {
        if self.recent_trades.is_empty() {
            return 0.0;
        }
        let wins = self.recent_trades.iter().filter(|w| **w).count() as f64;
        (wins / self.recent_trades.len() as f64) * 100.0
    }

    pub fn log_metrics(&self) {
        tracing::info!(
            cycles = self.cycles_run,
            signals_generated = self.signals_generated,
            signals_filtered = self.signals_filtered,
            trades_executed = self.trades_executed,
            trades_failed = self.trades_failed,
            recent_win_rate = format!("{:.1}%", self.recent_win_rate()),
            last_cycle_ms = self.last_total_duration_ms,
            last_scan_ms = self.last_scan_duration_ms,
            "core metrics summary"
        );
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cycles_run": self.cycles_run,
            "signals_generated": self.signals_generated,
            "signals_filtered": self.signals_filtered,
            "trades_executed": self.trades_executed,
            "trades_failed": self.trades_failed,
        })
    }

    pub fn restore_from_json(&mut self, json: &serde_json::Value) {
        if let Some(v) = json.get("cycles_run").and_then(|v| v.as_u64()) {
            self.cycles_run = v;
        }
        if let Some(v) = json.get("signals_generated").and_then(|v| v.as_u64()) {
            self.signals_generated = v;
        }
        if let Some(v) = json.get("signals_filtered").and_then(|v| v.as_u64()) {
            self.signals_filtered = v;
        }
        if let Some(v) = json.get("trades_executed").and_then(|v| v.as_u64()) {
            self.trades_executed = v;
        }
        if let Some(v) = json.get("trades_failed").and_then(|v| v.as_u64()) {
            self.trades_failed = v;
        }
        tracing::info!("restored core metrics from persisted state (cycles={})", self.cycles_run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_win_rate_is_zero_with_no_trades() {
        let metrics = CoreMetrics::new(10);
        assert_eq!(metrics.recent_win_rate(), 0.0);
    }

    #[test]
    fn recent_win_rate_tracks_last_20() {
        let mut metrics = CoreMetrics::new(10);
        for _ in 0..15 {
            metrics.record_trade_result(true);
        }
        for _ in 0..10 {
            metrics.record_trade_result(false);
        }
        // window holds the most recent 20: 5 wins, 15 losses
        assert!((metrics.recent_win_rate() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn restore_from_json_round_trips_counters() {
        let mut metrics = CoreMetrics::new(10);
        metrics.cycles_run = 5;
        metrics.trades_executed = 3;
        let json = metrics.to_json();

        let mut restored = CoreMetrics::new(10);
        restored.restore_from_json(&json);
        assert_eq!(restored.cycles_run, 5);
        assert_eq!(restored.trades_executed, 3);
    }
}
