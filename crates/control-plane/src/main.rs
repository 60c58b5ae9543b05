//! The control plane binary: wires components A-L into one process and
//! drives them on independent schedules (spec §4.K).
//!
//! Grounded on `trading-agent/src/main.rs`: dotenv + tracing init with the
//! json/plain format switch, a panic hook that logs through `tracing`
//! instead of letting a panic message go to stderr unseen, startup
//! connectivity checks that warn rather than abort, metrics persisted across
//! restarts, and a `tokio::select!` shutdown race against SIGINT/SIGTERM.

mod artifact_loader;
mod auto_select;
mod config;
mod ingestion;
mod metrics;
mod mt5_sync;
mod predictive;
mod scheduler;
mod signal_sink;
mod state_manager;

use std::sync::Arc;
use std::time::Duration;

use activity_bus::ActivityBus;
use analysis_core::{DxyContextSource, SignalAnalyzer, Timeframe};
use anyhow::Context;
use broker_bridge::{BridgeClient, BridgeRequest};
use dxy_context::{ActivityPublisher, DxyContextService};
use execution_governance::settings;
use model_registry::ModelRegistry;
use opportunity_scanner::{parse_universe, OpportunityScanner};
use order_executor::OrderExecutor;
use signal_pipeline::SignalPipeline;
use sqlx::AnyPool;
use tokio::sync::watch;

use crate::artifact_loader::JsonArtifactLoader;
use crate::auto_select::AutoSelector;
use crate::config::Settings;
use crate::ingestion::Ingestor;
use crate::metrics::CoreMetrics;
use crate::signal_sink::DbSignalSink;
use crate::state_manager::StateManager;

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "process panicked");
    }));
}

const BRIDGE_TIMEOUT_MS: u64 = 3_000;

async fn startup_checks(pool: &AnyPool, bridge: &Arc<BridgeClient>) {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => tracing::info!("startup check: database reachable"),
        Err(e) => tracing::warn!(error = %e, "startup check: database probe failed"),
    }

    let reply = bridge.call(&BridgeRequest::Ping, BRIDGE_TIMEOUT_MS).await;
    if broker_bridge::reply_error(&reply).is_some() {
        tracing::warn!("startup check: broker bridge unreachable, continuing in degraded mode");
    } else {
        tracing::info!("startup check: broker bridge reachable");
    }

    if let Err(e) = mt5_sync::recover_stale_orders(bridge, BRIDGE_TIMEOUT_MS).await {
        tracing::warn!(error = %e, "startup recovery: could not fetch open orders");
    }
}

async fn ingest_and_scan(
    pool: AnyPool,
    ingestor: Arc<Ingestor>,
    scanner: Arc<OpportunityScanner>,
    cycle_metrics: Arc<tokio::sync::Mutex<CoreMetrics>>,
) -> anyhow::Result<()> {
    let universe_json = settings::get_string(&pool, "SCANNER_UNIVERSE_JSON").await;
    let universe = parse_universe(universe_json.as_deref());

    for sym in &universe.symbols {
        for tf in universe.timeframes() {
            match ingestor.ingest(&sym.symbol, tf, universe.min_candles as u32).await {
                Ok(inserted) if inserted > 0 => {
                    tracing::debug!(symbol = %sym.symbol, timeframe = tf.as_str(), inserted, "candles ingested");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(symbol = %sym.symbol, timeframe = tf.as_str(), error = %e, "candle ingestion failed"),
            }
        }
    }

    let scan_start = CoreMetrics::start_timer();
    let signals = scanner.scan_once(universe_json.as_deref()).await.context("scanner sweep failed")?;

    let mut metrics = cycle_metrics.lock().await;
    metrics.record_scan_duration(scan_start);
    metrics.signals_generated += signals.len() as u64;
    metrics.finish_cycle(scan_start);

    tracing::info!(signals = signals.len(), "scan cycle complete");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cfg = Settings::from_env().context("loading settings")?;
    init_logging(cfg.log_format_json);

    tracing::info!("starting control plane");

    sqlx::any::install_default_drivers();
    let pool = AnyPool::connect(&cfg.database_url).await.context("connecting to database")?;

    let state_manager = StateManager::new(pool.clone());
    state_manager.init_tables().await.context("initializing tables")?;

    let bridge = Arc::new(BridgeClient::new(cfg.bridge_host.clone(), cfg.bridge_port));

    startup_checks(&pool, &bridge).await;

    let mut position_sync_account = settings::get_string(&pool, "MT5_ACCOUNT_ID").await;
    if position_sync_account.is_none() {
        position_sync_account = Some("default".to_string());
    }
    let position_sync = Arc::new(mt5_sync::PositionSync::new(
        Arc::clone(&bridge),
        pool.clone(),
        position_sync_account.unwrap(),
        BRIDGE_TIMEOUT_MS,
    ));

    let activity_bus = Arc::new(ActivityBus::new());
    let dxy_service = Arc::new(DxyContextService::new(pool.clone(), Some(Arc::clone(&activity_bus) as Arc<dyn ActivityPublisher>)));

    let model_registry = Arc::new(ModelRegistry::new(Arc::new(JsonArtifactLoader)));

    let pipeline = Arc::new(SignalPipeline::new(
        pool.clone(),
        Arc::clone(&model_registry),
        Arc::clone(&dxy_service) as Arc<dyn DxyContextSource>,
    ));

    let ingestor = Arc::new(Ingestor::new(Arc::clone(&bridge), pool.clone(), BRIDGE_TIMEOUT_MS));
    let signal_sink = Arc::new(DbSignalSink::new(pool.clone()));
    let scanner = Arc::new(OpportunityScanner::new(
        Arc::clone(&pipeline) as Arc<dyn SignalAnalyzer>,
        Arc::clone(&ingestor) as Arc<dyn opportunity_scanner::CandleStore>,
        signal_sink as Arc<dyn opportunity_scanner::SignalSink>,
    ));

    let executor = Arc::new(OrderExecutor::new(Arc::clone(&bridge), pool.clone()));
    let auto_selector = Arc::new(AutoSelector::new(pool.clone(), Arc::clone(&bridge), Arc::clone(&executor), 120, 12.0));

    let metrics = Arc::new(tokio::sync::Mutex::new({
        let mut m = CoreMetrics::new(cfg.heartbeat_interval_cycles);
        if let Ok(Some(json)) = state_manager.load_metrics().await {
            m.restore_from_json(&json);
        }
        m
    }));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::new();

    {
        let pool = pool.clone();
        let ingestor = Arc::clone(&ingestor);
        let scanner = Arc::clone(&scanner);
        let metrics = Arc::clone(&metrics);
        handles.push(scheduler::spawn_job(
            "ingest_and_scan",
            Duration::from_secs(cfg.ingest_and_scan_period_secs),
            shutdown_rx.clone(),
            move || ingest_and_scan(pool.clone(), Arc::clone(&ingestor), Arc::clone(&scanner), Arc::clone(&metrics)),
        ));
    }

    {
        let dxy_service = Arc::clone(&dxy_service);
        handles.push(scheduler::spawn_job(
            "refresh_dxy_context",
            Duration::from_secs(cfg.dxy_refresh_period_secs),
            shutdown_rx.clone(),
            move || {
                let dxy_service = Arc::clone(&dxy_service);
                async move {
                    dxy_service.refresh(None).await.context("dxy refresh failed")?;
                    Ok(())
                }
            },
        ));
    }

    {
        let position_sync = Arc::clone(&position_sync);
        handles.push(scheduler::spawn_job(
            "mt5_position_sync",
            Duration::from_secs(cfg.dxy_refresh_period_secs),
            shutdown_rx.clone(),
            move || {
                let position_sync = Arc::clone(&position_sync);
                async move { position_sync.sync_once().await }
            },
        ));
    }

    {
        let auto_selector = Arc::clone(&auto_selector);
        handles.push(scheduler::spawn_job(
            "scanner_auto_select",
            Duration::from_secs(cfg.scanner_auto_select_period_secs),
            shutdown_rx.clone(),
            move || {
                let auto_selector = Arc::clone(&auto_selector);
                async move { auto_selector.run_once().await }
            },
        ));
    }

    {
        let pool = pool.clone();
        handles.push(scheduler::spawn_job(
            "predictive_run",
            Duration::from_secs(cfg.predictive_run_period_secs),
            shutdown_rx.clone(),
            move || {
                let pool = pool.clone();
                async move { predictive::run_report(&pool, "XAUUSD", Timeframe::M15).await }
            },
        ));
    }

    {
        handles.push(scheduler::spawn_job(
            "train_models",
            Duration::from_secs(cfg.train_models_period_secs),
            shutdown_rx.clone(),
            move || async move {
                tracing::debug!("train_models tick: model training is out of scope, no-op");
                Ok(())
            },
        ));
    }

    tracing::info!(jobs = handles.len(), "control plane running");

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("installing SIGTERM handler")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
    }

    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }

    if let Ok(metrics) = metrics.try_lock() {
        let _ = state_manager.save_metrics(&metrics.to_json()).await;
    }

    tracing::info!("control plane stopped");
    Ok(())
}
