//! Engine error taxonomy.
//!
//! Callers distinguish validation failures (reject the request), missing
//! documents (report and continue), embedding failures (degrade gracefully),
//! and storage errors (surface as internal).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KbError {
    /// Input failed a precondition; nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The embedding provider failed. Structured data is unaffected.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Malformed JSON in a stored or supplied field.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KbError>;
