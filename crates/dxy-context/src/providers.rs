//! DXY quote providers, tried in order until one succeeds.
//!
//! Grounded on `original_source/backend/app/market_data/providers/
//! {yahoo,twelvedata,fmp}.py` (via `dxy_tracker.py::_build_provider_chain`):
//! the configured primary is tried first, then the remaining providers in a
//! fixed fallback order, deduplicated; TwelveData/FMP are skipped entirely
//! without an API key.

use analysis_core::CoreError;
use async_trait::async_trait;

#[async_trait]
pub trait DxyProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn quote(&self, client: &reqwest::Client) -> Result<f64, CoreError>;
}

pub struct YahooProvider {
    symbol: String,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self { symbol: "DX-Y.NYB".to_string() }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DxyProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn quote(&self, client: &reqwest::Client) -> Result<f64, CoreError> {
        let url = format!("https://query1.finance.yahoo.com/v8/finance/chart/{}", self.symbol);
        let body: serde_json::Value = client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::BridgeError(format!("yahoo dxy fetch: {e}")))?
            .json()
            .await
            .map_err(|e| CoreError::BridgeError(format!("yahoo dxy decode: {e}")))?;

        body["chart"]["result"][0]["meta"]["regularMarketPrice"]
            .as_f64()
            .ok_or_else(|| CoreError::BridgeError("yahoo dxy: no regularMarketPrice".to_string()))
    }
}

pub struct TwelveDataProvider {
    api_key: String,
    symbol: String,
}

impl TwelveDataProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), symbol: "DXY".to_string() }
    }
}

#[async_trait]
impl DxyProvider for TwelveDataProvider {
    fn name(&self) -> &'static str {
        "twelvedata"
    }

    async fn quote(&self, client: &reqwest::Client) -> Result<f64, CoreError> {
        let url = format!(
            "https://api.twelvedata.com/price?symbol={}&apikey={}",
            self.symbol, self.api_key
        );
        let body: serde_json::Value = client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::BridgeError(format!("twelvedata dxy fetch: {e}")))?
            .json()
            .await
            .map_err(|e| CoreError::BridgeError(format!("twelvedata dxy decode: {e}")))?;

        body["price"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CoreError::BridgeError("twelvedata dxy: no price field".to_string()))
    }
}

pub struct FmpProvider {
    api_key: String,
    symbol: String,
}

impl FmpProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), symbol: "DXY".to_string() }
    }
}

#[async_trait]
impl DxyProvider for FmpProvider {
    fn name(&self) -> &'static str {
        "fmp"
    }

    async fn quote(&self, client: &reqwest::Client) -> Result<f64, CoreError> {
        let url = format!(
            "https://financialmodelingprep.com/api/v3/quote-short/{}?apikey={}",
            self.symbol, self.api_key
        );
        let body: serde_json::Value = client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::BridgeError(format!("fmp dxy fetch: {e}")))?
            .json()
            .await
            .map_err(|e| CoreError::BridgeError(format!("fmp dxy decode: {e}")))?;

        body[0]["price"]
            .as_f64()
            .ok_or_else(|| CoreError::BridgeError("fmp dxy: no price field".to_string()))
    }
}

/// Builds the fallback chain: the configured primary first, then the rest
/// of the fixed order, deduplicated; TwelveData/FMP only appear if an API
/// key is available.
pub fn build_provider_chain(primary: &str, api_key: Option<&str>) -> Vec<Box<dyn DxyProvider>> {
    let order = ["twelvedata", "fmp", "yahoo"];
    let mut names: Vec<&str> = vec![primary];
    names.extend(order.iter().filter(|n| **n != primary));

    let mut seen = std::collections::HashSet::new();
    let mut chain: Vec<Box<dyn DxyProvider>> = Vec::new();
    for name in names {
        if !seen.insert(name) {
            continue;
        }
        match name {
            "twelvedata" => {
                if let Some(key) = api_key {
                    chain.push(Box::new(TwelveDataProvider::new(key)));
                }
            }
            "fmp" => {
                if let Some(key) = api_key {
                    chain.push(Box::new(FmpProvider::new(key)));
                }
            }
            _ => chain.push(Box::new(YahooProvider::new())),
        }
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_provider_is_tried_first() {
        let chain = build_provider_chain("fmp", Some("key"));
        assert_eq!(chain[0].name(), "fmp");
    }

    #[test]
    fn api_key_less_providers_are_skipped_without_a_key() {
        let chain = build_provider_chain("twelvedata", None);
        assert!(chain.iter().all(|p| p.name() == "yahoo"));
    }
}
