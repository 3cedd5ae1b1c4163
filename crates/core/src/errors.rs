use thiserror::Error;

/// Unified error type for the entire stock-portfolio-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Holding not found: {0}")]
    HoldingNotFound(String),

    // ── Market Data ─────────────────────────────────────────────────
    #[error("Upstream error ({provider}): {message}")]
    Upstream {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No quote provider configured: {0}")]
    NoProvider(String),

    // ── Import / Export ─────────────────────────────────────────────
    #[error("Invalid import file: {0}")]
    ImportFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Persistence ─────────────────────────────────────────────────
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("File I/O error: {0}")]
    FileIO(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full request URL, and the quote API takes
        // its key as a query parameter.
        CoreError::Network(redact_query(&e.to_string()))
    }
}

/// Strip everything after the first `?` so API keys never reach logs or the UI.
pub(crate) fn redact_query(msg: &str) -> String {
    match msg.find('?') {
        Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
        None => msg.to_string(),
    }
}
