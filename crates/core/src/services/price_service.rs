use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, warn};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::quote::{PriceUpdate, Quote, SymbolMatch, TimedCache, WeekRange};
use crate::models::settings::MarketDataConfig;
use crate::providers::registry::QuoteProviderRegistry;
use crate::providers::traits::QuoteProvider;

/// Fetches quotes from API providers with a short-lived cache.
///
/// Cache strategy:
/// - **Quotes and 52-week ranges** are cached separately, keyed by uppercase symbol.
/// - An entry is served until it is `cache_ttl` old, then re-fetched.
/// - The cache lives for the lifetime of the service; nothing is persisted.
///
/// Bulk refreshes go out in batches of `batch_size` with `batch_delay`
/// between them to stay under the free-tier rate limit.
pub struct PriceService {
    registry: QuoteProviderRegistry,
    config: MarketDataConfig,
    quotes: Mutex<TimedCache<Quote>>,
    ranges: Mutex<TimedCache<WeekRange>>,
}

impl PriceService {
    pub fn new(registry: QuoteProviderRegistry, config: MarketDataConfig) -> Self {
        let ttl = config.cache_ttl();
        Self {
            registry,
            config,
            quotes: Mutex::new(TimedCache::new(ttl)),
            ranges: Mutex::new(TimedCache::new(ttl)),
        }
    }

    /// Check if at least one provider is registered.
    pub fn has_provider(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn get_provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Latest quote for `symbol`, from cache when fresh.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        if let Some(quote) = self.quotes.lock().await.get(symbol, Instant::now()) {
            debug!("Quote cache hit for {symbol}");
            return Ok(quote);
        }
        debug!("Quote cache miss for {symbol}");

        let quote = self
            .with_fallback(symbol, |provider| provider.get_quote(symbol))
            .await?;
        if !quote.price.is_finite() || quote.price < 0.0 {
            return Err(CoreError::Upstream {
                provider: self.registry.names().join(", "),
                message: format!(
                    "Invalid price returned for {symbol}: {} (must be finite and non-negative)",
                    quote.price
                ),
            });
        }

        self.quotes
            .lock()
            .await
            .insert(symbol, quote.clone(), Instant::now());
        Ok(quote)
    }

    /// 52-week high/low for `symbol` as of `today`, from cache when fresh.
    pub async fn get_52_week_range(
        &self,
        symbol: &str,
        today: NaiveDate,
    ) -> Result<WeekRange, CoreError> {
        if let Some(range) = self.ranges.lock().await.get(symbol, Instant::now()) {
            debug!("Range cache hit for {symbol}");
            return Ok(range);
        }
        debug!("Range cache miss for {symbol}");

        let range = self
            .with_fallback(symbol, |provider| provider.get_52_week_range(symbol, today))
            .await?;

        self.ranges
            .lock()
            .await
            .insert(symbol, range.clone(), Instant::now());
        Ok(range)
    }

    /// Symbol lookup. Not cached.
    pub async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        self.with_fallback(keywords, |provider| provider.search_symbols(keywords))
            .await
    }

    /// Fetch current prices for every holding.
    ///
    /// Holdings whose quote fails are logged and left out, so the result may
    /// be shorter than the input. Order follows the input.
    pub async fn update_prices(&self, holdings: &[Holding]) -> Vec<PriceUpdate> {
        let batch_size = self.config.batch_size.max(1);
        let batch_count = holdings.len().div_ceil(batch_size);
        let mut updates = Vec::with_capacity(holdings.len());

        for (i, batch) in holdings.chunks(batch_size).enumerate() {
            debug!(
                "Fetching price batch {}/{} ({} symbols)",
                i + 1,
                batch_count,
                batch.len()
            );

            let results = join_all(batch.iter().map(|h| self.get_quote(&h.ticker))).await;
            for (holding, result) in batch.iter().zip(results) {
                match result {
                    Ok(quote) => updates.push(PriceUpdate {
                        id: holding.id,
                        current_price: quote.price,
                    }),
                    Err(e) => warn!("Failed to update price for {}: {e}", holding.ticker),
                }
            }

            if i + 1 < batch_count && !self.config.batch_delay().is_zero() {
                tokio::time::sleep(self.config.batch_delay()).await;
            }
        }

        updates
    }

    /// Drop every cached quote and range.
    pub async fn clear_cache(&self) {
        self.quotes.lock().await.clear();
        self.ranges.lock().await.clear();
    }

    /// Try providers in registration order. If the primary fails (API down,
    /// rate limited, etc.), fall back to the next one.
    async fn with_fallback<'a, T, F, Fut>(&'a self, subject: &str, call: F) -> Result<T, CoreError>
    where
        F: Fn(&'a dyn QuoteProvider) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider(subject.to_string()));
        }

        let mut last_error = None;
        for provider in self.registry.providers() {
            match call(provider).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("{} failed for {subject}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(subject.to_string())))
    }
}
