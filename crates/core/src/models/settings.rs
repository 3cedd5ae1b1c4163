use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;

use super::recommendation::RecommendationThresholds;

/// Key under `api_keys` for the Alpha Vantage provider.
pub const ALPHAVANTAGE_KEY: &str = "alphavantage";

/// User-configurable settings. Every field has a default, so a partial
/// JSON config file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Symbol prefixed to formatted currency values (e.g., "$").
    pub currency_symbol: String,

    /// API keys per provider (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,

    pub market_data: MarketDataConfig,

    pub recommendations: RecommendationThresholds,

    /// Look-ahead window for the upcoming dividends list.
    pub upcoming_dividend_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            api_keys: HashMap::new(),
            market_data: MarketDataConfig::default(),
            recommendations: RecommendationThresholds::default(),
            upcoming_dividend_days: 30,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Deserialization(format!("Invalid settings: {e}")))
    }

    /// Read settings from a JSON file on disk.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn api_key(&self, provider: &str) -> Option<&str> {
        self.api_keys.get(provider).map(String::as_str)
    }
}

/// Quote cache and rate-limit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// How long a fetched quote or range stays fresh.
    pub cache_ttl_secs: u64,

    /// Symbols fetched concurrently per batch in a price refresh.
    pub batch_size: usize,

    /// Pause between batches.
    pub batch_delay_ms: u64,

    pub request_timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            batch_size: 5,
            batch_delay_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

impl MarketDataConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
