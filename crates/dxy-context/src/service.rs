//! Component J: the DXY Context Service refresh loop.
//!
//! Grounded on `original_source/backend/app/market_data/dxy_tracker.py::
//! fetch_and_cache_dxy`: skip when not due, try providers in order, derive
//! impact/strength from the price delta, push both rolling series, recompute
//! correlation, and write the context back under the TTL. Key-level
//! crossing alerts (`dxy_guardian/tracker.py`) are published through the
//! Activity Bus when available.

use std::sync::Arc;
use std::time::Duration;

use analysis_core::{ActivityEvent, CoreError, DxyContext, DxyContextSource, DxyImpact};
use sqlx::AnyPool;

use crate::cache::DxyCache;
use crate::correlation::{corr_strength, rolling_corr};
use crate::key_levels::{check_crossings, default_levels, DxyLevel};
use crate::providers::build_provider_chain;

/// Fire-and-forget sink for key-level crossing alerts; implemented by the
/// not-yet-built `activity-bus` crate at composition time.
pub trait ActivityPublisher: Send + Sync {
    fn publish(&self, event: ActivityEvent);
}

fn compute_impact_strength(prev: Option<f64>, curr: f64) -> (DxyImpact, analysis_core::DxyStrength) {
    use analysis_core::DxyStrength;

    let Some(prev) = prev else { return (DxyImpact::Neutral, DxyStrength::Low) };
    let delta = curr - prev;
    let ad = delta.abs();

    if ad < 0.03 {
        return (DxyImpact::Neutral, DxyStrength::Low);
    }

    // DXY up => bearish for gold; DXY down => bullish.
    let impact = if delta > 0.0 { DxyImpact::Bearish } else { DxyImpact::Bullish };
    let strength = if ad >= 0.12 {
        DxyStrength::Strong
    } else if ad >= 0.06 {
        DxyStrength::Moderate
    } else {
        DxyStrength::Low
    };

    (impact, strength)
}

pub struct DxyContextService {
    pool: AnyPool,
    cache: DxyCache,
    http: reqwest::Client,
    key_levels: Vec<DxyLevel>,
    publisher: Option<Arc<dyn ActivityPublisher>>,
}

impl DxyContextService {
    pub fn new(pool: AnyPool, publisher: Option<Arc<dyn ActivityPublisher>>) -> Self {
        Self {
            pool,
            cache: DxyCache::new(),
            http: reqwest::Client::new(),
            key_levels: default_levels(),
            publisher,
        }
    }

    /// Runs one refresh pass (spec §4.J). `xau_last_close` is the most
    /// recent XAUUSD close, pushed into the rolling series alongside the
    /// new DXY close when present.
    pub async fn refresh(&self, xau_last_close: Option<f64>) -> Result<Option<DxyContext>, CoreError> {
        let refresh_seconds = execution_governance::settings::get_i64(&self.pool, "DXY_REFRESH_SECONDS", 60).await;
        if !self.cache.due_for_refresh(Duration::from_secs(refresh_seconds.max(0) as u64)) {
            return Ok(self.cache.get());
        }

        let primary = execution_governance::settings::get_string(&self.pool, "DXY_PROVIDER")
            .await
            .unwrap_or_else(|| "yahoo".to_string());
        let api_key = execution_governance::settings::get_string(&self.pool, "DXY_API_KEY").await;
        let ttl_seconds = execution_governance::settings::get_i64(&self.pool, "DXY_CACHE_TTL_SECONDS", 90).await;

        let chain = build_provider_chain(&primary, api_key.as_deref());

        let mut quote = None;
        let mut used_provider = primary.clone();
        let mut last_error = None;
        for provider in &chain {
            match provider.quote(&self.http).await {
                Ok(price) => {
                    quote = Some(price);
                    used_provider = provider.name().to_string();
                    break;
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        let Some(price) = quote else {
            self.cache.mark_refreshed();
            return Err(CoreError::BridgeError(format!(
                "all DXY providers failed: {}",
                last_error.unwrap_or_else(|| "no providers configured".to_string())
            )));
        };

        let prev_price = self.cache.prev_price();
        let (impact, strength) = compute_impact_strength(prev_price, price);

        if let Some(xau) = xau_last_close {
            self.cache.push_xau(xau);
        }
        self.cache.push_dxy(price);

        let corr = rolling_corr(&self.cache.xau_series(), &self.cache.dxy_series());
        let corr_strength_label = corr_strength(corr);

        let context = DxyContext {
            provider: used_provider,
            symbol: "DXY".to_string(),
            current_dxy: price,
            impact,
            strength,
            corr_rolling: corr,
            corr_strength: Some(corr_strength_label),
            updated_at: chrono::Utc::now(),
        };

        self.cache.set(context.clone(), Duration::from_secs(ttl_seconds.max(0) as u64));
        self.cache.mark_refreshed();

        if let Some(prev) = prev_price {
            self.emit_key_level_alerts(prev, price);
        }

        Ok(Some(context))
    }

    fn emit_key_level_alerts(&self, prev: f64, current: f64) {
        let Some(publisher) = &self.publisher else { return };
        for crossing in check_crossings(&self.key_levels, prev, current) {
            publisher.publish(ActivityEvent {
                event_type: "dxy_key_level".to_string(),
                payload: serde_json::json!({
                    "price": crossing.level.price,
                    "level_type": format!("{:?}", crossing.level.level_type),
                    "message": crossing.message,
                }),
                timestamp_ms: chrono::Utc::now().timestamp_millis(),
            });
        }
    }
}

impl DxyContextSource for DxyContextService {
    fn current(&self) -> Option<DxyContext> {
        self.cache.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_delta_is_neutral() {
        let (impact, strength) = compute_impact_strength(Some(100.0), 100.01);
        assert_eq!(impact, DxyImpact::Neutral);
        assert_eq!(strength, analysis_core::DxyStrength::Low);
    }

    #[test]
    fn dxy_up_is_bearish_for_gold() {
        let (impact, strength) = compute_impact_strength(Some(100.0), 100.2);
        assert_eq!(impact, DxyImpact::Bearish);
        assert_eq!(strength, analysis_core::DxyStrength::Strong);
    }

    #[test]
    fn dxy_down_is_bullish_for_gold() {
        let (impact, _) = compute_impact_strength(Some(100.0), 99.9);
        assert_eq!(impact, DxyImpact::Bullish);
    }

    #[test]
    fn no_previous_price_is_neutral() {
        let (impact, strength) = compute_impact_strength(None, 100.0);
        assert_eq!(impact, DxyImpact::Neutral);
        assert_eq!(strength, analysis_core::DxyStrength::Low);
    }
}
