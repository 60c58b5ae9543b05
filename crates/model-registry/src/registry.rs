//! Component D: Model Registry Cache.
//!
//! Grounded on spec §4.D and `original_source/app/ai/registry/runtime.py`
//! (`ModelCache.get_model_artifact`) / `app/models/model_registry.py` for
//! the table shape.

use std::sync::Arc;

use analysis_core::{CoreError, ModelRegistryEntry, ModelType, Predictor, Timeframe};
use sqlx::AnyPool;

use crate::cache::{CacheKey, CachedArtifact, ModelCache};

/// Loads an artifact at a stored path into an opaque `Predictor`. The core
/// doesn't know how model files are serialized — that's supplied by
/// whatever ML framework binding is wired in at startup (spec §4.D:
/// "artifact shape the core assumes").
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, artifact_path: &str) -> Result<Arc<dyn Predictor + Send + Sync>, CoreError>;
}

pub struct ModelRegistry {
    cache: ModelCache,
    loader: Arc<dyn ArtifactLoader>,
}

async fn fetch_active_row(
    pool: &AnyPool,
    model_type: ModelType,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<Option<ModelRegistryEntry>, CoreError> {
    let row = sqlx::query_as::<_, ModelRegistryRow>(
        "SELECT id, model_type, symbol, timeframe, version, artifact_path, metrics, is_active, created_at
         FROM model_registry
         WHERE model_type = $1 AND symbol = $2 AND timeframe = $3 AND is_active = true
         LIMIT 1",
    )
    .bind(model_type.as_str())
    .bind(symbol)
    .bind(timeframe.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self { cache: ModelCache::new(), loader }
    }

    /// Contract: `get(type, symbol, timeframe) -> (artifact, entry) |
    /// (null, null)`. A missing row or a loader failure both degrade to
    /// `(None, entry_or_none)` rather than propagating an error — the
    /// Scorer treats an absent model as "no ML signal this round", not a
    /// hard failure.
    pub async fn get(
        &self,
        pool: &AnyPool,
        model_type: ModelType,
        symbol: &str,
        timeframe: Timeframe,
    ) -> (Option<Arc<dyn Predictor + Send + Sync>>, Option<ModelRegistryEntry>) {
        let entry = match fetch_active_row(pool, model_type, symbol, timeframe).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return (None, None),
            Err(e) => {
                tracing::warn!(error = %e, "model registry lookup failed");
                return (None, None);
            }
        };

        let key = CacheKey { model_type, symbol: symbol.to_string(), timeframe };

        if self.cache.is_current(&key, &entry.artifact_path, &entry.version) {
            if let Some(cached) = self.cache.get(&key) {
                return (Some(cached.predictor), Some(entry));
            }
        }

        match self.loader.load(&entry.artifact_path) {
            Ok(predictor) => {
                self.cache.insert(
                    key,
                    CachedArtifact {
                        predictor: predictor.clone(),
                        artifact_path: entry.artifact_path.clone(),
                        version: entry.version.clone(),
                    },
                );
                (Some(predictor), Some(entry))
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %entry.artifact_path, "malformed model artifact, treating as missing");
                (None, Some(entry))
            }
        }
    }
}

#[derive(sqlx::FromRow)]
struct ModelRegistryRow {
    id: i64,
    model_type: String,
    symbol: String,
    timeframe: String,
    version: String,
    artifact_path: String,
    metrics: Option<serde_json::Value>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ModelRegistryRow> for ModelRegistryEntry {
    fn from(row: ModelRegistryRow) -> Self {
        let model_type = match row.model_type.as_str() {
            "lightgbm" => ModelType::LightGbm,
            "lstm" => ModelType::Lstm,
            _ => ModelType::XgBoost,
        };
        let timeframe = row.timeframe.parse().unwrap_or(Timeframe::M15);
        ModelRegistryEntry {
            id: Some(row.id),
            model_type,
            symbol: row.symbol,
            timeframe,
            version: row.version,
            artifact_path: row.artifact_path,
            metrics: row.metrics.unwrap_or(serde_json::Value::Null),
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}
