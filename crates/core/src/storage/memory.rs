use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::Dividend;
use crate::models::portfolio::Portfolio;

use super::records::{HoldingRecord, TransactionRecord, UserDocument};
use super::traits::PortfolioStore;

/// In-process store: one [`UserDocument`] per user, lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, UserDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the raw document stored for `user_id`.
    pub async fn document(&self, user_id: &str) -> Option<UserDocument> {
        self.documents.read().await.get(user_id).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn load_snapshot(&self, user_id: &str) -> Result<Portfolio, CoreError> {
        Ok(self
            .documents
            .read()
            .await
            .get(user_id)
            .map(UserDocument::to_portfolio)
            .unwrap_or_default())
    }

    async fn upsert_holding(&self, user_id: &str, record: &HoldingRecord) -> Result<(), CoreError> {
        self.documents
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .upsert_holding(record);
        Ok(())
    }

    async fn delete_holding(&self, user_id: &str, holding_id: Uuid) -> Result<(), CoreError> {
        if let Some(doc) = self.documents.write().await.get_mut(user_id) {
            doc.delete_holding(holding_id);
        }
        Ok(())
    }

    async fn append_transaction(
        &self,
        user_id: &str,
        record: &TransactionRecord,
    ) -> Result<(), CoreError> {
        self.documents
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .transactions
            .push(record.clone());
        Ok(())
    }

    async fn replace_all(&self, user_id: &str, portfolio: &Portfolio) -> Result<(), CoreError> {
        self.documents
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .replace_all(user_id, portfolio);
        Ok(())
    }

    async fn load_dividends(&self, user_id: &str) -> Result<Vec<Dividend>, CoreError> {
        Ok(self
            .documents
            .read()
            .await
            .get(user_id)
            .map(|doc| doc.dividends.clone())
            .unwrap_or_default())
    }

    async fn save_dividend(&self, user_id: &str, dividend: &Dividend) -> Result<(), CoreError> {
        self.documents
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .save_dividend(dividend);
        Ok(())
    }
}
