use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::holding::{Holding, NewHolding, DEFAULT_SECTOR};
use crate::models::portfolio::Portfolio;
use crate::models::transaction::{SellOutcome, Trade, Transaction};

const INITIAL_PURCHASE_NOTE: &str = "Initial purchase";

/// Ledger mutations: add, buy more, sell, delete, reprice.
///
/// Pure business logic with no I/O. Every operation validates
/// before touching the portfolio, so a failed call leaves it unchanged.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Create a holding from its first purchase and record the mirroring buy.
    pub fn add_holding(
        &self,
        portfolio: &mut Portfolio,
        new: NewHolding,
        now: DateTime<Utc>,
    ) -> Result<(Holding, Transaction), CoreError> {
        let sector = new
            .sector
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SECTOR.to_string());

        let holding = Holding {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            ticker: new.ticker.trim().to_uppercase(),
            units: new.units,
            avg_cost: new.price,
            current_price: new.current_price,
            sector,
            low_52_week: new.low_52_week,
            high_52_week: new.high_52_week,
            notes: new.notes.clone().unwrap_or_default(),
            date_added: now,
        };
        holding.validate()?;

        let date = new.purchase_date.unwrap_or_else(|| now.date_naive());
        let notes = new.notes.unwrap_or_else(|| INITIAL_PURCHASE_NOTE.to_string());
        let transaction = Transaction::buy(&holding, holding.units, holding.avg_cost, date, notes);

        info!(
            "Added holding {} ({} units @ {})",
            holding.ticker, holding.units, holding.avg_cost
        );
        portfolio.holdings.push(holding.clone());
        portfolio.transactions.push(transaction.clone());
        Ok((holding, transaction))
    }

    /// Buy more units, folding the purchase into the weighted-average cost.
    pub fn buy_more(
        &self,
        portfolio: &mut Portfolio,
        holding_id: Uuid,
        trade: &Trade,
    ) -> Result<(Holding, Transaction), CoreError> {
        let idx = Self::position(portfolio, holding_id)?;
        require_positive("Units", trade.units)?;
        require_positive("Price", trade.price)?;

        let holding = &mut portfolio.holdings[idx];
        let total_units = holding.units + trade.units;
        let total_cost = holding.avg_cost * holding.units + trade.price * trade.units;
        holding.avg_cost = total_cost / total_units;
        holding.units = total_units;
        let updated = holding.clone();

        let transaction =
            Transaction::buy(&updated, trade.units, trade.price, trade.date, trade.notes.clone());
        portfolio.transactions.push(transaction.clone());

        info!(
            "Bought {} more {} @ {} (avg cost now {:.4})",
            trade.units, updated.ticker, trade.price, updated.avg_cost
        );
        Ok((updated, transaction))
    }

    /// Sell units at `trade.price`, realizing gain/loss against the current average cost.
    ///
    /// Selling exactly the held units removes the holding; its transactions stay.
    pub fn sell(
        &self,
        portfolio: &mut Portfolio,
        holding_id: Uuid,
        trade: &Trade,
    ) -> Result<SellOutcome, CoreError> {
        let idx = Self::position(portfolio, holding_id)?;
        let held = portfolio.holdings[idx].units;

        if !trade.units.is_finite() || trade.units <= 0.0 || trade.units > held {
            return Err(CoreError::ValidationError(
                "Invalid number of units to sell".into(),
            ));
        }
        if !trade.price.is_finite() || trade.price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Price must be a non-negative number, got {}",
                trade.price
            )));
        }

        let transaction = Transaction::sell(
            &portfolio.holdings[idx],
            trade.units,
            trade.price,
            trade.date,
            trade.notes.clone(),
        );
        portfolio.transactions.push(transaction.clone());

        if trade.units == held {
            let removed = portfolio.holdings.remove(idx);
            info!("Sold all {} units of {}", held, removed.ticker);
            return Ok(SellOutcome {
                fully_sold: true,
                holding: None,
                transaction,
            });
        }

        let holding = &mut portfolio.holdings[idx];
        holding.units = held - trade.units;
        info!(
            "Sold {} {} @ {} ({} left)",
            trade.units, holding.ticker, trade.price, holding.units
        );
        Ok(SellOutcome {
            fully_sold: false,
            holding: Some(holding.clone()),
            transaction,
        })
    }

    /// Remove a holding outright. No transaction is recorded.
    pub fn delete_holding(
        &self,
        portfolio: &mut Portfolio,
        holding_id: Uuid,
    ) -> Result<Holding, CoreError> {
        let idx = Self::position(portfolio, holding_id)?;
        let removed = portfolio.holdings.remove(idx);
        info!("Deleted holding {}", removed.ticker);
        Ok(removed)
    }

    /// Overwrite the market price of one holding. No transaction is recorded.
    pub fn set_current_price(
        &self,
        portfolio: &mut Portfolio,
        holding_id: Uuid,
        price: f64,
    ) -> Result<Holding, CoreError> {
        let idx = Self::position(portfolio, holding_id)?;
        if !price.is_finite() || price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Price must be a non-negative number, got {price}"
            )));
        }
        let holding = &mut portfolio.holdings[idx];
        holding.current_price = price;
        Ok(holding.clone())
    }

    /// Replace the ledger with a snapshot from the store. Never merges.
    pub fn apply_snapshot(&self, portfolio: &mut Portfolio, snapshot: Portfolio) {
        info!(
            "Applying snapshot: {} holdings, {} transactions",
            snapshot.holdings.len(),
            snapshot.transactions.len()
        );
        *portfolio = snapshot;
    }

    pub fn get_holding<'a>(&self, portfolio: &'a Portfolio, holding_id: Uuid) -> Option<&'a Holding> {
        portfolio.holdings.iter().find(|h| h.id == holding_id)
    }

    /// All transactions, newest date first. Equal dates keep insertion order.
    pub fn get_transactions<'a>(&self, portfolio: &'a Portfolio) -> Vec<&'a Transaction> {
        let mut transactions: Vec<&Transaction> = portfolio.transactions.iter().collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions
    }

    /// Transactions recorded against one holding, newest first.
    /// Still works after the holding itself is gone.
    pub fn get_transactions_for_holding<'a>(
        &self,
        portfolio: &'a Portfolio,
        holding_id: Uuid,
    ) -> Vec<&'a Transaction> {
        let mut transactions: Vec<&Transaction> = portfolio
            .transactions
            .iter()
            .filter(|t| t.stock_id == holding_id)
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions
    }

    fn position(portfolio: &Portfolio, holding_id: Uuid) -> Result<usize, CoreError> {
        portfolio
            .holdings
            .iter()
            .position(|h| h.id == holding_id)
            .ok_or_else(|| CoreError::HoldingNotFound(holding_id.to_string()))
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::ValidationError(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}
