use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::holding::Holding;

/// Type of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "buy"),
            TransactionType::Sell => write!(f, "sell"),
        }
    }
}

/// An immutable buy/sell record.
///
/// Ticker and name are copied from the holding when the transaction is
/// recorded, so history stays readable after the holding is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    pub stock_id: Uuid,
    pub ticker: String,
    pub stock_name: String,

    pub units: f64,

    /// Price per unit
    pub price: f64,

    pub date: NaiveDate,

    /// Realized gain/loss, sells only: (price − avg cost at sale) × units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain_or_loss: Option<f64>,

    #[serde(default)]
    pub notes: String,
}

impl Transaction {
    pub fn buy(holding: &Holding, units: f64, price: f64, date: NaiveDate, notes: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_type: TransactionType::Buy,
            stock_id: holding.id,
            ticker: holding.ticker.clone(),
            stock_name: holding.name.clone(),
            units,
            price,
            date,
            gain_or_loss: None,
            notes: notes.into(),
        }
    }

    /// Record a sale against `holding`, realizing gain/loss at its current average cost.
    pub fn sell(holding: &Holding, units: f64, price: f64, date: NaiveDate, notes: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_type: TransactionType::Sell,
            stock_id: holding.id,
            ticker: holding.ticker.clone(),
            stock_name: holding.name.clone(),
            units,
            price,
            date,
            gain_or_loss: Some((price - holding.avg_cost) * units),
            notes: notes.into(),
        }
    }

    /// Units × price.
    pub fn total(&self) -> f64 {
        self.units * self.price
    }
}

/// Units, price, date and notes for a buy-more or sell action.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub units: f64,
    pub price: f64,
    pub date: NaiveDate,
    pub notes: String,
}

impl Trade {
    pub fn new(units: f64, price: f64, date: NaiveDate) -> Self {
        Self {
            units,
            price,
            date,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Result of a sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SellOutcome {
    /// `true` when every unit was sold and the holding was removed
    pub fully_sold: bool,
    /// The remaining holding, `None` when fully sold
    pub holding: Option<Holding>,
    pub transaction: Transaction,
}
