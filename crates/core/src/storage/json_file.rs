use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::Dividend;
use crate::models::portfolio::Portfolio;

use super::records::{HoldingRecord, TransactionRecord, UserDocument};
use super::traits::PortfolioStore;

/// Local store: one pretty-printed `<user_id>.json` per user under `dir`.
///
/// Every write is read-modify-write of the whole document, serialised
/// through one lock, and lands via a temp file + rename.
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// The directory is created on first write if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `user_id`. User IDs become file names, so
    /// anything beyond `[A-Za-z0-9_-]` is rejected.
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf, CoreError> {
        let valid = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CoreError::ValidationError(format!(
                "Invalid user id for file storage: '{user_id}'"
            )));
        }
        Ok(self.dir.join(format!("{user_id}.json")))
    }

    async fn read(&self, user_id: &str) -> Result<UserDocument, CoreError> {
        let path = self.path_for(user_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                CoreError::Persistence(format!("Corrupt document {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(UserDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, user_id: &str, doc: &UserDocument) -> Result<(), CoreError> {
        let path = self.path_for(user_id)?;
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize document: {e}")))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    async fn update<F>(&self, user_id: &str, change: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut UserDocument) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read(user_id).await?;
        change(&mut doc);
        self.write(user_id, &doc).await
    }
}

#[async_trait]
impl PortfolioStore for JsonFileStore {
    async fn load_snapshot(&self, user_id: &str) -> Result<Portfolio, CoreError> {
        Ok(self.read(user_id).await?.to_portfolio())
    }

    async fn upsert_holding(&self, user_id: &str, record: &HoldingRecord) -> Result<(), CoreError> {
        self.update(user_id, |doc| doc.upsert_holding(record)).await
    }

    async fn delete_holding(&self, user_id: &str, holding_id: Uuid) -> Result<(), CoreError> {
        self.update(user_id, |doc| doc.delete_holding(holding_id))
            .await
    }

    async fn append_transaction(
        &self,
        user_id: &str,
        record: &TransactionRecord,
    ) -> Result<(), CoreError> {
        self.update(user_id, |doc| doc.transactions.push(record.clone()))
            .await
    }

    async fn replace_all(&self, user_id: &str, portfolio: &Portfolio) -> Result<(), CoreError> {
        self.update(user_id, |doc| doc.replace_all(user_id, portfolio))
            .await
    }

    async fn load_dividends(&self, user_id: &str) -> Result<Vec<Dividend>, CoreError> {
        Ok(self.read(user_id).await?.dividends)
    }

    async fn save_dividend(&self, user_id: &str, dividend: &Dividend) -> Result<(), CoreError> {
        self.update(user_id, |doc| doc.save_dividend(dividend)).await
    }
}
