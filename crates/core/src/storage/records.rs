use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::dividend::Dividend;
use crate::models::holding::Holding;
use crate::models::portfolio::Portfolio;
use crate::models::transaction::Transaction;

/// A holding as stored: the holding's own fields plus its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecord {
    #[serde(flatten)]
    pub holding: Holding,
    pub user_id: String,
    /// Set when the price was last refreshed from the market
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl HoldingRecord {
    pub fn new(user_id: &str, holding: Holding) -> Self {
        Self {
            holding,
            user_id: user_id.to_string(),
            last_updated: None,
        }
    }

    pub fn refreshed_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub user_id: String,
}

impl TransactionRecord {
    pub fn new(user_id: &str, transaction: Transaction) -> Self {
        Self {
            transaction,
            user_id: user_id.to_string(),
        }
    }
}

/// Everything stored for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDocument {
    pub holdings: Vec<HoldingRecord>,
    pub transactions: Vec<TransactionRecord>,
    pub dividends: Vec<Dividend>,
}

impl UserDocument {
    pub fn to_portfolio(&self) -> Portfolio {
        Portfolio::new(
            self.holdings.iter().map(|r| r.holding.clone()).collect(),
            self.transactions
                .iter()
                .map(|r| r.transaction.clone())
                .collect(),
        )
    }

    pub fn upsert_holding(&mut self, record: &HoldingRecord) {
        match self
            .holdings
            .iter_mut()
            .find(|r| r.holding.id == record.holding.id)
        {
            Some(existing) => *existing = record.clone(),
            None => self.holdings.push(record.clone()),
        }
    }

    pub fn delete_holding(&mut self, holding_id: uuid::Uuid) {
        self.holdings.retain(|r| r.holding.id != holding_id);
    }

    pub fn replace_all(&mut self, user_id: &str, portfolio: &Portfolio) {
        self.holdings = portfolio
            .holdings
            .iter()
            .map(|h| HoldingRecord::new(user_id, h.clone()))
            .collect();
        self.transactions = portfolio
            .transactions
            .iter()
            .map(|t| TransactionRecord::new(user_id, t.clone()))
            .collect();
    }

    pub fn save_dividend(&mut self, dividend: &Dividend) {
        match self.dividends.iter_mut().find(|d| d.id == dividend.id) {
            Some(existing) => *existing = dividend.clone(),
            None => self.dividends.push(dividend.clone()),
        }
    }
}
