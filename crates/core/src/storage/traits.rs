use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::Dividend;
use crate::models::portfolio::Portfolio;

use super::records::{HoldingRecord, TransactionRecord};

/// Document store holding each user's ledger.
///
/// Writes are per record so a single mutation touches only what changed;
/// `replace_all` exists for imports. Last writer wins.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Everything stored for `user_id`. An unknown user has an empty portfolio.
    async fn load_snapshot(&self, user_id: &str) -> Result<Portfolio, CoreError>;

    /// Insert or overwrite the holding with `record.holding.id`.
    async fn upsert_holding(&self, user_id: &str, record: &HoldingRecord) -> Result<(), CoreError>;

    /// Remove a holding. Removing a missing one is not an error.
    async fn delete_holding(&self, user_id: &str, holding_id: Uuid) -> Result<(), CoreError>;

    async fn append_transaction(
        &self,
        user_id: &str,
        record: &TransactionRecord,
    ) -> Result<(), CoreError>;

    /// Overwrite every holding and transaction. Dividends are kept.
    async fn replace_all(&self, user_id: &str, portfolio: &Portfolio) -> Result<(), CoreError>;

    async fn load_dividends(&self, user_id: &str) -> Result<Vec<Dividend>, CoreError>;

    /// Insert or overwrite the dividend with `dividend.id`.
    async fn save_dividend(&self, user_id: &str, dividend: &Dividend) -> Result<(), CoreError>;
}
