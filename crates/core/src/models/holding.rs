use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::utils::parse_number;

/// Sector label used when none is given.
pub const DEFAULT_SECTOR: &str = "Other";

/// A current position in one ticker.
///
/// `units` stays strictly positive while the holding exists: a sale that
/// brings it to exactly zero removes the holding from the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: Uuid,

    /// Display name (e.g., "Apple Inc.")
    pub name: String,

    /// Ticker symbol, uppercased (e.g., "AAPL")
    pub ticker: String,

    pub units: f64,

    /// Weighted-average cost per unit
    pub avg_cost: f64,

    /// Latest known market price per unit
    pub current_price: f64,

    /// Free-text sector label, matched case-sensitively when grouping
    pub sector: String,

    #[serde(rename = "low52Week", default)]
    pub low_52_week: Option<f64>,

    #[serde(rename = "high52Week", default)]
    pub high_52_week: Option<f64>,

    #[serde(default)]
    pub notes: String,

    pub date_added: DateTime<Utc>,
}

impl Holding {
    /// Market value: units × current price.
    pub fn market_value(&self) -> f64 {
        self.units * self.current_price
    }

    /// Cost basis: units × average cost.
    pub fn cost_basis(&self) -> f64 {
        self.units * self.avg_cost
    }

    /// Unrealized gain (positive) or loss (negative) in currency.
    pub fn unrealized_gain_loss(&self) -> f64 {
        (self.current_price - self.avg_cost) * self.units
    }

    /// Check the invariants a stored holding must satisfy.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.ticker.trim().is_empty() {
            return Err(CoreError::ValidationError("Ticker must not be empty".into()));
        }
        if !self.units.is_finite() || self.units <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Units for {} must be a positive number, got {}",
                self.ticker, self.units
            )));
        }
        if !self.avg_cost.is_finite() || self.avg_cost < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Average cost for {} must be a non-negative number, got {}",
                self.ticker, self.avg_cost
            )));
        }
        if !self.current_price.is_finite() || self.current_price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Current price for {} must be a non-negative number, got {}",
                self.ticker, self.current_price
            )));
        }
        Ok(())
    }
}

/// Parsed input for creating a holding (the first purchase).
#[derive(Debug, Clone, PartialEq)]
pub struct NewHolding {
    pub name: String,
    pub ticker: String,
    pub units: f64,
    /// Purchase price per unit; becomes the initial average cost
    pub price: f64,
    pub current_price: f64,
    pub sector: Option<String>,
    pub low_52_week: Option<f64>,
    pub high_52_week: Option<f64>,
    pub notes: Option<String>,
    /// Date recorded on the initial buy transaction; defaults to today
    pub purchase_date: Option<NaiveDate>,
}

impl NewHolding {
    pub fn new(
        name: impl Into<String>,
        ticker: impl Into<String>,
        units: f64,
        price: f64,
        current_price: f64,
    ) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
            units,
            price,
            current_price,
            sector: None,
            low_52_week: None,
            high_52_week: None,
            notes: None,
            purchase_date: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_range(mut self, low: f64, high: f64) -> Self {
        self.low_52_week = Some(low);
        self.high_52_week = Some(high);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.purchase_date = Some(date);
        self
    }
}

/// Raw, unparsed "add stock" form input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoldingForm {
    pub name: String,
    pub ticker: String,
    pub units: String,
    pub price: String,
    pub current_price: String,
    pub sector: String,
    #[serde(rename = "low52Week")]
    pub low_52_week: String,
    #[serde(rename = "high52Week")]
    pub high_52_week: String,
    pub notes: String,
}

impl TryFrom<&HoldingForm> for NewHolding {
    type Error = CoreError;

    fn try_from(form: &HoldingForm) -> Result<Self, Self::Error> {
        Ok(Self {
            name: form.name.trim().to_string(),
            ticker: form.ticker.trim().to_string(),
            units: parse_number("Units", &form.units)?,
            price: parse_number("Price", &form.price)?,
            current_price: parse_number("Current price", &form.current_price)?,
            sector: non_blank(&form.sector),
            low_52_week: parse_optional("52-week low", &form.low_52_week)?,
            high_52_week: parse_optional("52-week high", &form.high_52_week)?,
            notes: non_blank(&form.notes),
            purchase_date: None,
        })
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_optional(field: &str, input: &str) -> Result<Option<f64>, CoreError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse_number(field, input).map(Some)
}
