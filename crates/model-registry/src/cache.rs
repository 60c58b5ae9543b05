//! In-process hot-reload cache keyed by (model_type, symbol, timeframe).
//!
//! Grounded on `original_source/app/ai/registry/runtime.py::ModelCache`:
//! an entry is only reloaded when the registry row's `(artifact_path,
//! version)` differs from what's cached, not on a fixed TTL — the TTL in
//! the original is only a refresh-hint left unused by the simpler
//! path/version comparison the code actually does, so this port keeps the
//! comparison, not the timer.

use std::sync::Arc;

use analysis_core::{ModelType, Predictor, Timeframe};
use dashmap::DashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub model_type: ModelType,
    pub symbol: String,
    pub timeframe: Timeframe,
}

#[derive(Clone)]
pub struct CachedArtifact {
    pub predictor: Arc<dyn Predictor + Send + Sync>,
    pub artifact_path: String,
    pub version: String,
}

#[derive(Default)]
pub struct ModelCache {
    loaded: DashMap<CacheKey, CachedArtifact>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self { loaded: DashMap::new() }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedArtifact> {
        self.loaded.get(key).map(|e| e.clone())
    }

    /// True when the cached entry is still current for `(artifact_path,
    /// version)` — a no-op reload.
    pub fn is_current(&self, key: &CacheKey, artifact_path: &str, version: &str) -> bool {
        self.loaded
            .get(key)
            .map(|e| e.artifact_path == artifact_path && e.version == version)
            .unwrap_or(false)
    }

    pub fn insert(&self, key: CacheKey, artifact: CachedArtifact) {
        self.loaded.insert(key, artifact);
    }
}
