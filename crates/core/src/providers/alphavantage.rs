use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::QuoteProvider;
use crate::errors::CoreError;
use crate::models::quote::{Quote, SymbolMatch, WeekRange};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage API provider for equity quotes.
///
/// - **Free tier**: 25 requests/day, 5 requests/minute.
/// - **Requires**: API key (set via settings as "alphavantage").
/// - **Endpoints**: `GLOBAL_QUOTE`, `TIME_SERIES_WEEKLY`, `SYMBOL_SEARCH`.
///
/// Every numeric field in the responses is a JSON string; parsing lives in
/// the free functions below so it can be tested without the network.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<String, CoreError> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));

        let body = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Deserialize)]
struct WeeklySeriesResponse {
    #[serde(rename = "Weekly Time Series")]
    series: Option<HashMap<String, WeeklyBar>>,
}

#[derive(Deserialize)]
struct WeeklyBar {
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
}

#[derive(Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SearchMatch>,
}

#[derive(Deserialize)]
struct SearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name", default)]
    name: String,
    #[serde(rename = "3. type", default)]
    asset_type: String,
    #[serde(rename = "4. region", default)]
    region: String,
    #[serde(rename = "8. currency", default)]
    currency: String,
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let symbol = symbol.to_uppercase();
        debug!("GET {PROVIDER} GLOBAL_QUOTE {symbol}");
        let body = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", &symbol)])
            .await?;
        parse_global_quote(&symbol, &body)
    }

    async fn get_52_week_range(&self, symbol: &str, today: NaiveDate) -> Result<WeekRange, CoreError> {
        let symbol = symbol.to_uppercase();
        debug!("GET {PROVIDER} TIME_SERIES_WEEKLY {symbol}");
        let body = self
            .query(&[("function", "TIME_SERIES_WEEKLY"), ("symbol", &symbol)])
            .await?;
        parse_weekly_range(&symbol, &body, today)
    }

    async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        debug!("GET {PROVIDER} SYMBOL_SEARCH '{keywords}'");
        let body = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", keywords)])
            .await?;
        parse_symbol_search(&body)
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse a `GLOBAL_QUOTE` response body. The price is mandatory; other
/// numeric fields default to 0 when absent.
pub fn parse_global_quote(symbol: &str, body: &str) -> Result<Quote, CoreError> {
    check_api_message(body)?;
    let resp: GlobalQuoteResponse = serde_json::from_str(body)
        .map_err(|e| upstream(format!("Failed to parse quote for {symbol}: {e}")))?;

    let quote = resp
        .global_quote
        .ok_or_else(|| upstream(format!("No quote data for {symbol}")))?;

    let price_str = quote
        .price
        .ok_or_else(|| upstream(format!("No price in quote for {symbol}")))?;
    let price = parse_field(symbol, "price", &price_str)?;

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        change: lenient(quote.change.as_deref()),
        change_percent: lenient(quote.change_percent.as_deref().map(|s| s.trim_end_matches('%'))),
        high: lenient(quote.high.as_deref()),
        low: lenient(quote.low.as_deref()),
        volume: quote
            .volume
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0),
        as_of_date: quote
            .latest_trading_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
    })
}

/// Parse a `TIME_SERIES_WEEKLY` body into the range over the year ending `today`.
pub fn parse_weekly_range(symbol: &str, body: &str, today: NaiveDate) -> Result<WeekRange, CoreError> {
    check_api_message(body)?;
    let resp: WeeklySeriesResponse = serde_json::from_str(body)
        .map_err(|e| upstream(format!("Failed to parse weekly series for {symbol}: {e}")))?;

    let series = resp
        .series
        .ok_or_else(|| upstream(format!("No weekly series for {symbol}")))?;

    let year_ago = today
        .checked_sub_months(Months::new(12))
        .unwrap_or(NaiveDate::MIN);

    let mut high_52_week = f64::NEG_INFINITY;
    let mut low_52_week = f64::INFINITY;
    for (date_str, bar) in &series {
        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };
        if date < year_ago {
            continue;
        }
        high_52_week = high_52_week.max(parse_field(symbol, "weekly high", &bar.high)?);
        low_52_week = low_52_week.min(parse_field(symbol, "weekly low", &bar.low)?);
    }

    if !high_52_week.is_finite() || !low_52_week.is_finite() {
        return Err(upstream(format!(
            "No weekly data for {symbol} in the last 52 weeks"
        )));
    }

    Ok(WeekRange {
        symbol: symbol.to_string(),
        high_52_week,
        low_52_week,
    })
}

/// Parse a `SYMBOL_SEARCH` body. A body without matches yields an empty list.
pub fn parse_symbol_search(body: &str) -> Result<Vec<SymbolMatch>, CoreError> {
    check_api_message(body)?;
    let resp: SymbolSearchResponse = serde_json::from_str(body)
        .map_err(|e| upstream(format!("Failed to parse symbol search: {e}")))?;

    Ok(resp
        .best_matches
        .into_iter()
        .map(|m| SymbolMatch {
            symbol: m.symbol,
            name: m.name,
            asset_type: m.asset_type,
            region: m.region,
            currency: m.currency,
        })
        .collect())
}

/// Alpha Vantage reports errors and throttling with HTTP 200 and one of
/// these top-level keys.
fn check_api_message(body: &str) -> Result<(), CoreError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| upstream(format!("Response is not JSON: {e}")))?;

    if let Some(msg) = value.get("Error Message").and_then(Value::as_str) {
        return Err(upstream(msg.to_string()));
    }
    for key in ["Note", "Information"] {
        if let Some(msg) = value.get(key).and_then(Value::as_str) {
            return Err(upstream(format!("API limit may be exceeded: {msg}")));
        }
    }
    Ok(())
}

fn parse_field(symbol: &str, field: &str, raw: &str) -> Result<f64, CoreError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| upstream(format!("Invalid {field} for {symbol}: '{raw}'")))
}

fn lenient(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn upstream(message: String) -> CoreError {
    CoreError::Upstream {
        provider: PROVIDER.into(),
        message,
    }
}
