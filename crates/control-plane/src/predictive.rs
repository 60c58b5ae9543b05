//! Component K's `predictive_run` job: walk-forward evaluation, Monte Carlo
//! equity resampling, and drift detection over recent realized P&L, rolled
//! up into a `PredictiveReport`.
//!
//! Grounded directly on `original_source/backend/app/predictive/
//! service.py::PredictiveService` (`walk_forward_eval`, `monte_carlo_equity`,
//! `detect_drift`); the Monte Carlo resampling loop follows the teacher's
//! dropped `backtest-engine/src/monte_carlo.rs::run_monte_carlo` shape
//! (shuffle via `rand::seq::SliceRandom`, track a running equity peak for
//! drawdown). The data model has no dedicated realized-trade ledger, so the
//! `profit` column on `mt5_position_snapshots` stands in as the P&L series
//! (see the grounding ledger for this substitution).

use analysis_core::{CoreError, PredictiveReport, Timeframe};
use execution_governance::settings;
use rand::seq::SliceRandom;
use sqlx::AnyPool;

const MIN_WALK_FORWARD_SAMPLES: usize = 60;
const MIN_DRIFT_SAMPLES: usize = 120;
const MONTE_CARLO_RUNS: usize = 500;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Value at `pct` (0..100) of a sorted copy of `values`, nearest-rank.
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[derive(Debug, Clone, Copy, Default)]
struct WalkForwardStats {
    sharpe: f64,
    winrate: f64,
    avg_return: f64,
}

fn walk_forward_eval(pnl: &[f64]) -> WalkForwardStats {
    if pnl.len() < MIN_WALK_FORWARD_SAMPLES {
        return WalkForwardStats::default();
    }

    let avg_return = mean(pnl);
    let sd = std_dev(pnl);
    let sharpe = if sd > 0.0 { (avg_return / sd) * TRADING_DAYS_PER_YEAR.sqrt() } else { 0.0 };
    let winrate = pnl.iter().filter(|p| **p > 0.0).count() as f64 / pnl.len() as f64;

    WalkForwardStats { sharpe, winrate, avg_return }
}

#[derive(Debug, Clone, Copy, Default)]
struct MonteCarloStats {
    max_dd: f64,
    var_95: f64,
}

fn monte_carlo_equity(pnl: &[f64]) -> MonteCarloStats {
    if pnl.len() < MIN_WALK_FORWARD_SAMPLES {
        return MonteCarloStats::default();
    }

    let mut rng = rand::thread_rng();
    let mut worst_drawdowns = Vec::with_capacity(MONTE_CARLO_RUNS);
    let mut end_values = Vec::with_capacity(MONTE_CARLO_RUNS);

    for _ in 0..MONTE_CARLO_RUNS {
        let mut shuffled = pnl.to_vec();
        shuffled.shuffle(&mut rng);

        let mut equity = 0.0;
        let mut peak = 0.0;
        let mut worst_dd = 0.0;
        for p in &shuffled {
            equity += p;
            if equity > peak {
                peak = equity;
            }
            let dd = equity - peak;
            if dd < worst_dd {
                worst_dd = dd;
            }
        }

        worst_drawdowns.push(worst_dd);
        end_values.push(equity);
    }

    MonteCarloStats { max_dd: percentile(&worst_drawdowns, 50.0), var_95: percentile(&end_values, 5.0) }
}

fn detect_drift(pnl: &[f64]) -> f64 {
    if pnl.len() < MIN_DRIFT_SAMPLES {
        return 0.0;
    }
    let mid = pnl.len() / 2;
    (mean(&pnl[..mid]) - mean(&pnl[mid..])).abs()
}

async fn load_pnl_series(pool: &AnyPool, symbol: &str) -> Result<Vec<f64>, CoreError> {
    let rows: Vec<(f64,)> = sqlx::query_as(
        "SELECT profit FROM mt5_position_snapshots WHERE symbol = $1 ORDER BY synced_at ASC",
    )
    .bind(symbol)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}

async fn persist_report(pool: &AnyPool, report: &PredictiveReport) -> Result<(), CoreError> {
    sqlx::query(
        "INSERT INTO predictive_reports
         (symbol, timeframe, wf_sharpe, wf_winrate, wf_avg_return, mc_max_dd, mc_var_95,
          drift_score, stability_score, meta, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
    )
    .bind(&report.symbol)
    .bind(report.timeframe.as_str())
    .bind(report.wf_sharpe)
    .bind(report.wf_winrate)
    .bind(report.wf_avg_return)
    .bind(report.mc_max_dd)
    .bind(report.mc_var_95)
    .bind(report.drift_score)
    .bind(report.stability_score)
    .bind(&report.meta)
    .bind(report.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Applies spec §4.K's auto-select gate: when the freshly computed
/// stability falls below `PREDICTIVE_STABILITY_MIN`, disable automation
/// with a reason rather than waiting for the next pre-trade gate check.
async fn apply_auto_select_gate(pool: &AnyPool, stability_score: f64) -> Result<(), CoreError> {
    let min_stability = settings::get_f64(pool, "PREDICTIVE_STABILITY_MIN", 120.0).await;
    if stability_score < min_stability {
        let reason = format!("predictive stability {stability_score:.2} below minimum {min_stability:.2}");
        settings::set_string(pool, "AUTO_SELECT_ENABLED", "false")
            .await
            .map_err(CoreError::from)?;
        settings::set_string(pool, "AUTO_SELECT_DISABLE_REASON", &reason)
            .await
            .map_err(CoreError::from)?;
        tracing::warn!(%reason, "auto-select disabled by predictive gate");
    }
    Ok(())
}

/// Runs one full report for `(symbol, timeframe)`: loads the P&L series,
/// evaluates walk-forward/Monte Carlo/drift, persists the report, and
/// applies the auto-select gate.
pub async fn run_report(pool: &AnyPool, symbol: &str, timeframe: Timeframe) -> anyhow::Result<()> {
    let pnl = load_pnl_series(pool, symbol).await?;

    let wf = walk_forward_eval(&pnl);
    let mc = monte_carlo_equity(&pnl);
    let drift = detect_drift(&pnl);
    let stability_score =
        PredictiveReport::compute_stability_score(wf.sharpe, wf.winrate, wf.avg_return, mc.max_dd, drift);

    let report = PredictiveReport {
        id: None,
        symbol: symbol.to_string(),
        timeframe,
        wf_sharpe: wf.sharpe,
        wf_winrate: wf.winrate,
        wf_avg_return: wf.avg_return,
        mc_max_dd: mc.max_dd,
        mc_var_95: mc.var_95,
        drift_score: drift,
        stability_score,
        meta: serde_json::json!({ "sample_size": pnl.len() }),
        created_at: chrono::Utc::now(),
    };

    persist_report(pool, &report).await?;
    apply_auto_select_gate(pool, stability_score).await?;

    tracing::info!(
        symbol,
        timeframe = timeframe.as_str(),
        stability_score,
        sample_size = pnl.len(),
        "predictive report computed"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_forward_needs_minimum_samples() {
        let stats = walk_forward_eval(&[1.0; 10]);
        assert_eq!(stats.sharpe, 0.0);
        assert_eq!(stats.winrate, 0.0);
    }

    #[test]
    fn walk_forward_winrate_counts_positive_pnl() {
        let mut pnl = vec![1.0; 40];
        pnl.extend(vec![-1.0; 20]);
        let stats = walk_forward_eval(&pnl);
        assert!((stats.winrate - (40.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn drift_needs_minimum_samples() {
        assert_eq!(detect_drift(&[1.0; 50]), 0.0);
    }

    #[test]
    fn drift_detects_mean_shift_between_halves() {
        let mut pnl = vec![1.0; 60];
        pnl.extend(vec![-1.0; 60]);
        assert!((detect_drift(&pnl) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn monte_carlo_short_series_returns_zeros() {
        let stats = monte_carlo_equity(&[1.0; 10]);
        assert_eq!(stats.max_dd, 0.0);
        assert_eq!(stats.var_95, 0.0);
    }

    #[test]
    fn monte_carlo_all_positive_pnl_has_no_drawdown() {
        let pnl = vec![1.0; 100];
        let stats = monte_carlo_equity(&pnl);
        assert_eq!(stats.max_dd, 0.0);
        assert!(stats.var_95 > 0.0);
    }

    #[test]
    fn percentile_of_sorted_values() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
    }
}
