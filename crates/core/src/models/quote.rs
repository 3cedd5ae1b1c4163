use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Latest quote for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    /// Latest trading day reported by the API
    pub as_of_date: Option<NaiveDate>,
}

/// 52-week trading range for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekRange {
    pub symbol: String,
    #[serde(rename = "high52Week")]
    pub high_52_week: f64,
    #[serde(rename = "low52Week")]
    pub low_52_week: f64,
}

/// A symbol search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub region: String,
    pub currency: String,
}

/// A refreshed price for one holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub id: Uuid,
    pub current_price: f64,
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// Time-boxed cache keyed by uppercase symbol.
///
/// An entry is served while it is younger than `ttl`; an expired entry is
/// left in place until the next insert for that key overwrites it.
#[derive(Debug, Clone)]
pub struct TimedCache<T> {
    ttl: Duration,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T: Clone> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Get a fresh entry as of `now`.
    pub fn get(&self, symbol: &str, now: Instant) -> Option<T> {
        let entry = self.entries.get(&symbol.to_uppercase())?;
        (now.saturating_duration_since(entry.fetched_at) < self.ttl).then(|| entry.value.clone())
    }

    pub fn insert(&mut self, symbol: &str, value: T, now: Instant) {
        self.entries.insert(
            symbol.to_uppercase(),
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }

    /// Number of stored entries, fresh or expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries that are expired as of `now`. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.fetched_at) < ttl);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
