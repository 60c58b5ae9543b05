//! Component H: Execution Governance pre-trade gate and post-trade violation
//! tracking.
//!
//! Grounded on `original_source/backend/app/execution/governance.py`
//! (`ExecutionGovernance.pre_trade_gate` / `post_trade_update`) plus the
//! predictive gate from `app/scanner/scanner_tasks.py::_run_auto_select_once`
//! and the rate limit from `app/scanner/execution_service.py::execute_best`.

use analysis_core::{CoreError, SignalSource};
use chrono::{Duration, Utc};
use sqlx::AnyPool;

use crate::settings;

#[derive(Debug, Clone, Default)]
pub struct GovernanceDecision {
    pub allow: bool,
    pub reason: Option<String>,
    pub disable_auto_select: bool,
}

impl GovernanceDecision {
    fn allow() -> Self {
        GovernanceDecision { allow: true, reason: None, disable_auto_select: false }
    }

    fn deny(reason: impl Into<String>) -> Self {
        GovernanceDecision { allow: false, reason: Some(reason.into()), disable_auto_select: false }
    }

    fn deny_and_disable(reason: impl Into<String>) -> Self {
        GovernanceDecision { allow: false, reason: Some(reason.into()), disable_auto_select: true }
    }
}

#[derive(sqlx::FromRow)]
struct StabilityRow {
    stability_score: f64,
    created_at: chrono::DateTime<Utc>,
}

async fn predictive_gate(pool: &AnyPool) -> Result<Option<String>, CoreError> {
    let max_age_min = settings::get_i64(pool, "PREDICTIVE_MAX_REPORT_AGE_MIN", 360).await;
    let min_stability = settings::get_f64(pool, "PREDICTIVE_STABILITY_MIN", 120.0).await;

    let row = sqlx::query_as::<_, StabilityRow>(
        "SELECT stability_score, created_at FROM predictive_reports
         WHERE symbol = $1 AND timeframe = $2
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind("XAUUSD")
    .bind("M15")
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(Some("no_predictive_report".to_string()));
    };

    let age = Utc::now() - row.created_at;
    if age > Duration::minutes(max_age_min) {
        return Ok(Some(format!("predictive_report_stale({}m)", age.num_minutes())));
    }

    if row.stability_score < min_stability {
        return Ok(Some(format!(
            "stability={:.2} < min={:.2}",
            row.stability_score, min_stability
        )));
    }

    Ok(None)
}

async fn trades_in_last_hour(pool: &AnyPool) -> Result<i64, CoreError> {
    let since = Utc::now() - Duration::hours(1);
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM execution_events WHERE created_at >= $1 AND source = $2",
    )
    .bind(since)
    .bind(SignalSource::Scanner.as_str())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// `decide(source, bridge_connected, is_automation)` from spec §4.H.
/// `source` isn't referenced by any current gate but is accepted to keep the
/// signature stable for future per-source rules.
pub async fn pre_trade_gate(
    pool: &AnyPool,
    _source: SignalSource,
    bridge_connected: bool,
    is_automation: bool,
) -> Result<GovernanceDecision, CoreError> {
    let guard_enabled = settings::get_bool(pool, "EXEC_GUARD_ENABLED", true).await;
    if !guard_enabled {
        return Ok(GovernanceDecision::allow());
    }

    if is_automation {
        let auto_enabled = settings::get_bool(pool, "AUTO_SELECT_ENABLED", false).await;
        if !auto_enabled {
            return Ok(GovernanceDecision::deny("AUTO_SELECT_ENABLED=false"));
        }

        if !bridge_connected {
            return Ok(GovernanceDecision::deny("bridge_disconnected"));
        }

        if let Some(reason) = predictive_gate(pool).await? {
            let full_reason = format!("predictive gate failed: {reason}");
            settings::set_string(pool, "AUTO_SELECT_ENABLED", "false").await?;
            settings::set_string(pool, "AUTO_SELECT_DISABLE_REASON", &full_reason).await?;
            return Ok(GovernanceDecision::deny_and_disable(full_reason));
        }

        let max_per_hour = settings::get_i64(pool, "AUTO_SELECT_MAX_TRADES_PER_HOUR", 2).await;
        let trades = trades_in_last_hour(pool).await?;
        if trades >= max_per_hour {
            return Ok(GovernanceDecision::deny(format!(
                "rate_limited: {trades} >= {max_per_hour} trades/hour"
            )));
        }
    }

    Ok(GovernanceDecision::allow())
}

/// Post-trade violation tracking (spec §4.H): on a violation, count similar
/// events in the trailing window and auto-disable automation past the
/// threshold. Returns `(disabled, reason)`.
pub async fn post_trade_update(
    pool: &AnyPool,
    violated: bool,
    violation_reason: Option<&str>,
) -> Result<(bool, Option<String>), CoreError> {
    if !violated {
        return Ok((false, None));
    }

    let disable_on_violation = settings::get_bool(pool, "EXEC_DISABLE_AUTO_ON_VIOLATION", true).await;
    if !disable_on_violation {
        return Ok((false, None));
    }

    let window_min = settings::get_i64(pool, "EXEC_VIOLATION_WINDOW_MIN", 15).await;
    let max_violations = settings::get_i64(pool, "EXEC_MAX_VIOLATIONS_IN_WINDOW", 3).await;
    let since = Utc::now() - Duration::minutes(window_min);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM execution_events WHERE created_at >= $1 AND status IN ('blocked', 'error')",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;

    if count < max_violations {
        return Ok((false, None));
    }

    let reason = violation_reason.unwrap_or("execution_violation");
    let full_reason = format!("Execution guard: {reason} (violations>={max_violations} in {window_min}m)");
    settings::set_string(pool, "AUTO_SELECT_ENABLED", "false").await?;
    settings::set_string(pool, "AUTO_SELECT_DISABLE_REASON", &full_reason).await?;

    Ok((true, Some(full_reason)))
}
