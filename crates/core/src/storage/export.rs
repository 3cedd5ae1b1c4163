use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::portfolio::Portfolio;
use crate::models::transaction::Transaction;

/// On-disk shape of an exported portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub stocks: Vec<Holding>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// What an import added to the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub holdings: usize,
    pub transactions: usize,
}

/// Pretty JSON with holdings under `stocks`. IDs are kept so a later
/// import can restore the exact ledger.
pub fn export_json(portfolio: &Portfolio) -> Result<String, CoreError> {
    let file = ExportFile {
        stocks: portfolio.holdings.clone(),
        transactions: portfolio.transactions.clone(),
    };
    serde_json::to_string_pretty(&file)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize export: {e}")))
}

/// Parse and validate an export file.
pub fn parse_import(json: &str) -> Result<ExportFile, CoreError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| CoreError::ImportFormat(format!("not valid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| CoreError::ImportFormat("expected a JSON object".into()))?;
    match object.get("stocks") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err(CoreError::ImportFormat("'stocks' must be an array".into())),
        None => return Err(CoreError::ImportFormat("missing 'stocks' array".into())),
    }
    match object.get("transactions") {
        None | Some(Value::Array(_)) => {}
        Some(_) => {
            return Err(CoreError::ImportFormat(
                "'transactions' must be an array".into(),
            ))
        }
    }

    let file: ExportFile = serde_json::from_value(value)
        .map_err(|e| CoreError::ImportFormat(format!("malformed record: {e}")))?;

    let mut seen = HashSet::with_capacity(file.stocks.len());
    for holding in &file.stocks {
        holding.validate().map_err(|e| {
            CoreError::ImportFormat(format!("holding {} is invalid: {e}", holding.ticker))
        })?;
        if !seen.insert(holding.id) {
            return Err(CoreError::ImportFormat(format!(
                "duplicate holding id {} ({})",
                holding.id, holding.ticker
            )));
        }
    }
    Ok(file)
}

/// Fold an import into `existing`.
///
/// With `replace_existing` the result is exactly the imported ledger.
/// Otherwise imported records are appended; holding IDs that collide with
/// existing ones get fresh IDs (their transactions follow), and colliding
/// transaction IDs are regenerated.
pub fn apply_import(
    existing: &Portfolio,
    import: ExportFile,
    replace_existing: bool,
) -> (Portfolio, ImportSummary) {
    let summary = ImportSummary {
        holdings: import.stocks.len(),
        transactions: import.transactions.len(),
    };

    if replace_existing {
        return (Portfolio::new(import.stocks, import.transactions), summary);
    }

    let mut merged = existing.clone();
    let mut holding_ids: HashSet<Uuid> = merged.holdings.iter().map(|h| h.id).collect();
    let mut remapped: HashMap<Uuid, Uuid> = HashMap::new();

    for mut holding in import.stocks {
        if !holding_ids.insert(holding.id) {
            let fresh = Uuid::new_v4();
            remapped.insert(holding.id, fresh);
            holding.id = fresh;
            holding_ids.insert(fresh);
        }
        merged.holdings.push(holding);
    }

    let mut transaction_ids: HashSet<Uuid> = merged.transactions.iter().map(|t| t.id).collect();
    for mut transaction in import.transactions {
        if let Some(fresh) = remapped.get(&transaction.stock_id) {
            transaction.stock_id = *fresh;
        }
        if !transaction_ids.insert(transaction.id) {
            transaction.id = Uuid::new_v4();
            transaction_ids.insert(transaction.id);
        }
        merged.transactions.push(transaction);
    }

    (merged, summary)
}
