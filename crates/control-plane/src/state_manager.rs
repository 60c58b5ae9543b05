//! Key-value agent state plus the data-model tables (spec §3).
//!
//! `init_tables` is grounded on `trading-agent/src/state_manager.rs::
//! init_tables`'s `CREATE TABLE IF NOT EXISTS` + `StateManager`'s
//! key-value accessors, extended to create every table spec §3 names
//! rather than just the equities agent's two.

use analysis_core::CoreError;
use sqlx::AnyPool;

pub struct StateManager {
    pool: AnyPool,
}

impl StateManager {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), CoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS agent_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                is_secret BOOLEAN NOT NULL DEFAULT false
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS candles (
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                time TIMESTAMP NOT NULL,
                open DOUBLE PRECISION NOT NULL,
                high DOUBLE PRECISION NOT NULL,
                low DOUBLE PRECISION NOT NULL,
                close DOUBLE PRECISION NOT NULL,
                volume DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (symbol, timeframe, time)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS trading_signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id BIGINT,
                source TEXT NOT NULL,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                action TEXT NOT NULL,
                confidence DOUBLE PRECISION NOT NULL,
                score DOUBLE PRECISION NOT NULL,
                entry_price DOUBLE PRECISION NOT NULL,
                suggested_sl DOUBLE PRECISION,
                suggested_tp DOUBLE PRECISION,
                reasons TEXT NOT NULL,
                context TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS model_registry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                model_type TEXT NOT NULL,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                version TEXT NOT NULL,
                artifact_path TEXT NOT NULL,
                metrics TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT false,
                created_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS execution_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TIMESTAMP NOT NULL,
                user_id BIGINT,
                source TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                volume DOUBLE PRECISION NOT NULL,
                requested_price DOUBLE PRECISION,
                sl DOUBLE PRECISION,
                tp DOUBLE PRECISION,
                status TEXT NOT NULL,
                ticket TEXT,
                fill_price DOUBLE PRECISION,
                slippage DOUBLE PRECISION,
                latency_ms BIGINT,
                bridge_connected BOOLEAN NOT NULL,
                error TEXT,
                request TEXT NOT NULL,
                response TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS predictive_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                wf_sharpe DOUBLE PRECISION NOT NULL,
                wf_winrate DOUBLE PRECISION NOT NULL,
                wf_avg_return DOUBLE PRECISION NOT NULL,
                mc_max_dd DOUBLE PRECISION NOT NULL,
                mc_var_95 DOUBLE PRECISION NOT NULL,
                drift_score DOUBLE PRECISION NOT NULL,
                stability_score DOUBLE PRECISION NOT NULL,
                meta TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS mt5_position_snapshots (
                account_id TEXT NOT NULL,
                ticket TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                volume DOUBLE PRECISION NOT NULL,
                open_price DOUBLE PRECISION NOT NULL,
                sl DOUBLE PRECISION,
                tp DOUBLE PRECISION,
                profit DOUBLE PRECISION NOT NULL,
                swap DOUBLE PRECISION NOT NULL,
                commission DOUBLE PRECISION NOT NULL,
                open_time TIMESTAMP NOT NULL,
                magic BIGINT,
                comment TEXT,
                synced_at TIMESTAMP NOT NULL,
                PRIMARY KEY (account_id, ticket)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_state(&self, key: &str, value: &str) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO agent_state (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_state(&self, key: &str) -> Result<Option<String>, CoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM agent_state WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn save_metrics(&self, metrics_json: &serde_json::Value) -> Result<(), CoreError> {
        self.save_state("core_metrics", &metrics_json.to_string()).await
    }

    pub async fn load_metrics(&self) -> Result<Option<serde_json::Value>, CoreError> {
        match self.load_state("core_metrics").await? {
            Some(s) => Ok(serde_json::from_str(&s).ok()),
            None => Ok(None),
        }
    }
}
