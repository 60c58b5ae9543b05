//! Component G: the Smart Opportunity Scanner sweep.
//!
//! Grounded on `original_source/backend/app/scanner/opportunity_scanner.py::
//! SmartOpportunityScanner.scan_once`: for every (symbol, timeframe) pair in
//! the universe, load the trailing candle window, skip if short, run the
//! Signal Pipeline, rescale the score by the symbol's weight, and collect a
//! `TradingSignal` row. All rows from one sweep are persisted in a single
//! transaction; the returned list is sorted by adjusted score descending.

use std::sync::Arc;

use analysis_core::{Candle, CoreError, SignalAnalyzer, SignalSource, Timeframe, TradingSignal};
use async_trait::async_trait;

use crate::universe::{parse_universe, rank_score, Universe};

/// Reads the trailing candle window for one (symbol, timeframe). Owned by
/// whatever ingestion layer the control plane wires in; the scanner only
/// ever reads, never writes, candles.
#[async_trait]
pub trait CandleStore: Send + Sync {
    async fn load_recent(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, CoreError>;
}

/// Persists one sweep's `TradingSignal` rows as a single atomic batch
/// (spec §4.G: "Persist all rows atomically per scan").
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn persist_batch(&self, signals: &[TradingSignal]) -> Result<(), CoreError>;
}

pub struct OpportunityScanner {
    pipeline: Arc<dyn SignalAnalyzer>,
    candles: Arc<dyn CandleStore>,
    sink: Arc<dyn SignalSink>,
}

impl OpportunityScanner {
    pub fn new(
        pipeline: Arc<dyn SignalAnalyzer>,
        candles: Arc<dyn CandleStore>,
        sink: Arc<dyn SignalSink>,
    ) -> Self {
        Self { pipeline, candles, sink }
    }

    /// Runs one full sweep over `universe_json` (the raw `SCANNER_UNIVERSE_JSON`
    /// setting value, or `None` to use the built-in default universe).
    pub async fn scan_once(&self, universe_json: Option<&str>) -> Result<Vec<TradingSignal>, CoreError> {
        let universe = parse_universe(universe_json);
        let mut results = self.scan_universe(&universe).await?;

        self.sink.persist_batch(&results).await?;

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    async fn scan_universe(&self, universe: &Universe) -> Result<Vec<TradingSignal>, CoreError> {
        let timeframes = universe.timeframes();
        let mut results = Vec::new();

        for sym in &universe.symbols {
            for &tf in &timeframes {
                let candles = self.candles.load_recent(&sym.symbol, tf, universe.min_candles).await?;
                if candles.len() < universe.min_candles {
                    tracing::debug!(symbol = %sym.symbol, timeframe = %tf.as_str(), got = candles.len(), "insufficient candles, skipping");
                    continue;
                }

                let mut signal = self.pipeline.analyze(&sym.symbol, tf, &candles).await?;
                signal.source = SignalSource::Scanner;
                signal.score = rank_score(signal.score, sym.weight);
                results.push(signal);
            }
        }

        Ok(results)
    }
}
