//! Process-level bootstrap configuration.
//!
//! Grounded on `trading-agent/src/config.rs::AgentConfig::from_env`: plain
//! `env::var(...).unwrap_or_else(...)` / `.context(...)?` reads, no config
//! file parser. This is the first of the two settings layers (spec §9's
//! "Settings-driven feature flags" note) — everything operator-tunable at
//! runtime lives in the `app_settings` table instead (see
//! `execution_governance::settings`), read fresh on every decision.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bridge_host: String,
    pub bridge_port: u16,
    pub log_format_json: bool,
    pub ingest_and_scan_period_secs: u64,
    pub dxy_refresh_period_secs: u64,
    pub scanner_auto_select_period_secs: u64,
    pub predictive_run_period_secs: u64,
    pub train_models_period_secs: u64,
    pub heartbeat_interval_cycles: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:gold_edge.db".to_string()),
            bridge_host: std::env::var("BRIDGE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            bridge_port: std::env::var("BRIDGE_PORT")
                .unwrap_or_else(|_| "9100".to_string())
                .parse()
                .context("BRIDGE_PORT must be a u16")?,
            log_format_json: std::env::var("RUST_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            ingest_and_scan_period_secs: env_u64("INGEST_AND_SCAN_PERIOD_SECS", 60)?,
            dxy_refresh_period_secs: env_u64("DXY_REFRESH_PERIOD_SECS", 30)?,
            scanner_auto_select_period_secs: env_u64("SCANNER_AUTO_SELECT_PERIOD_SECS", 60)?,
            predictive_run_period_secs: env_u64("PREDICTIVE_RUN_PERIOD_SECS", 6 * 3600)?,
            train_models_period_secs: env_u64("TRAIN_MODELS_PERIOD_SECS", 24 * 3600)?,
            heartbeat_interval_cycles: env_u64("HEARTBEAT_INTERVAL_CYCLES", 6)?,
        })
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("{key} must be a positive integer")),
        Err(_) => Ok(default),
    }
}
