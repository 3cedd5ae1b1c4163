use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::quote::{Quote, SymbolMatch, WeekRange};

/// Source of market data for equities.
///
/// The price service only talks to this trait, so swapping the quote API
/// (or stubbing it in tests) touches nothing else.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest quote for `symbol`.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError>;

    /// Highest high and lowest low over the year ending `today`.
    async fn get_52_week_range(&self, symbol: &str, today: NaiveDate) -> Result<WeekRange, CoreError>;

    /// Look up symbols matching free-text keywords.
    async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolMatch>, CoreError>;
}
