//! The single cache key + two bounded rolling series (spec §4.J).
//!
//! Grounded on `dxy_tracker.py`'s Redis-backed `REDIS_CTX_KEY`/
//! `REDIS_SERIES_XAU`/`REDIS_SERIES_DXY`, reimplemented in-process: a single
//! `RwLock`-guarded cached context with an expiry instant, and two
//! `VecDeque<f64>` capped at `SERIES_MAXLEN`.

use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use analysis_core::DxyContext;

pub const SERIES_MAXLEN: usize = 120;

struct CachedContext {
    context: DxyContext,
    expires_at: Instant,
}

pub struct DxyCache {
    slot: RwLock<Option<CachedContext>>,
    last_refresh: RwLock<Option<Instant>>,
    xau_series: RwLock<VecDeque<f64>>,
    dxy_series: RwLock<VecDeque<f64>>,
}

impl Default for DxyCache {
    fn default() -> Self {
        Self {
            slot: RwLock::new(None),
            last_refresh: RwLock::new(None),
            xau_series: RwLock::new(VecDeque::with_capacity(SERIES_MAXLEN)),
            dxy_series: RwLock::new(VecDeque::with_capacity(SERIES_MAXLEN)),
        }
    }
}

impl DxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` once the TTL has elapsed, even though the slot is still
    /// populated — matches `setex`'s expiry-on-read semantics.
    pub fn get(&self) -> Option<DxyContext> {
        let slot = self.slot.read().unwrap();
        slot.as_ref().and_then(|c| if c.expires_at > Instant::now() { Some(c.context.clone()) } else { None })
    }

    /// Previous cached price, ignoring TTL — used to compute impact/delta
    /// even if the context just expired (matches the original reading
    /// `prev_ctx_raw` unconditionally before checking freshness elsewhere).
    pub fn prev_price(&self) -> Option<f64> {
        self.slot.read().unwrap().as_ref().map(|c| c.context.current_dxy)
    }

    pub fn set(&self, context: DxyContext, ttl: Duration) {
        *self.slot.write().unwrap() = Some(CachedContext { context, expires_at: Instant::now() + ttl });
    }

    pub fn due_for_refresh(&self, refresh_period: Duration) -> bool {
        match *self.last_refresh.read().unwrap() {
            None => true,
            Some(last) => last.elapsed() >= refresh_period,
        }
    }

    pub fn mark_refreshed(&self) {
        *self.last_refresh.write().unwrap() = Some(Instant::now());
    }

    pub fn push_xau(&self, price: f64) {
        push_bounded(&self.xau_series, price);
    }

    pub fn push_dxy(&self, price: f64) {
        push_bounded(&self.dxy_series, price);
    }

    pub fn xau_series(&self) -> Vec<f64> {
        self.xau_series.read().unwrap().iter().copied().collect()
    }

    pub fn dxy_series(&self) -> Vec<f64> {
        self.dxy_series.read().unwrap().iter().copied().collect()
    }
}

fn push_bounded(series: &RwLock<VecDeque<f64>>, value: f64) {
    let mut s = series.write().unwrap();
    s.push_back(value);
    while s.len() > SERIES_MAXLEN {
        s.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_trims_to_max_length() {
        let cache = DxyCache::new();
        for i in 0..(SERIES_MAXLEN + 10) {
            cache.push_dxy(i as f64);
        }
        assert_eq!(cache.dxy_series().len(), SERIES_MAXLEN);
    }

    #[test]
    fn get_returns_none_before_any_set() {
        let cache = DxyCache::new();
        assert!(cache.get().is_none());
    }

    #[test]
    fn due_for_refresh_is_true_until_marked() {
        let cache = DxyCache::new();
        assert!(cache.due_for_refresh(Duration::from_secs(60)));
        cache.mark_refreshed();
        assert!(!cache.due_for_refresh(Duration::from_secs(60)));
    }
}
