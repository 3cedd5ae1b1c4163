use crate::models::settings::{Settings, ALPHAVANTAGE_KEY};

use super::alphavantage::AlphaVantageProvider;
use super::traits::QuoteProvider;

/// Registry of quote providers in priority order.
///
/// The price service tries them front to back, so a second provider acts
/// as a fallback when the first is down or rate limited.
pub struct QuoteProviderRegistry {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl QuoteProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with every provider the settings have keys for.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();

        // Alpha Vantage, requires an API key
        if let Some(key) = settings.api_key(ALPHAVANTAGE_KEY) {
            registry.register(Box::new(AlphaVantageProvider::new(
                key.to_string(),
                settings.market_data.request_timeout(),
            )));
        }

        registry
    }

    pub fn register(&mut self, provider: Box<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn QuoteProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

impl Default for QuoteProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
