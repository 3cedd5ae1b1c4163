use serde::{Deserialize, Serialize};

use super::holding::Holding;
use super::transaction::Transaction;

/// The ledger: current holdings plus the append-only transaction history.
///
/// This is also the snapshot shape exchanged with a [`PortfolioStore`]:
/// a snapshot replaces both lists wholesale.
///
/// [`PortfolioStore`]: crate::storage::traits::PortfolioStore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Current positions, unique by ID
    #[serde(default)]
    pub holdings: Vec<Holding>,

    /// Every buy/sell ever recorded, in insertion order
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>, transactions: Vec<Transaction>) -> Self {
        Self {
            holdings,
            transactions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty() && self.transactions.is_empty()
    }
}
