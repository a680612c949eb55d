//! Error types for docstore.
//!
//! Uses thiserror for derive macros. Every failure propagates to the caller;
//! nothing is retried internally.

use crate::exit_codes;
use std::time::Duration;
use thiserror::Error;

/// Main error type for docstore operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// The lock primitive could not be created, acquired or released.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// A bounded lock wait expired before the lock was granted.
    #[error("Lock acquisition timed out after {}ms", .0.as_millis())]
    TimeoutError(Duration),

    /// The document was read or mutated without holding the lock, or the lock
    /// was released by a thread that does not hold it.
    #[error("Concurrent modification: {0}")]
    MisuseError(String),

    /// The mutated document could not be written back to the backing file.
    #[error("Persistence failed: {0}")]
    PersistError(String),

    /// The backing file could not be read or is not a well-formed document.
    #[error("Document error: {0}")]
    DocumentError(String),

    /// A directive list could not be parsed or failed while being applied.
    #[error("Directive failed: {0}")]
    DirectiveError(String),

    /// A path expression could not be parsed.
    #[error("Invalid path expression: {0}")]
    QueryError(String),
}

impl StoreError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            StoreError::UserError(_) => exit_codes::USER_ERROR,
            StoreError::LockError(_) | StoreError::TimeoutError(_) => exit_codes::LOCK_FAILURE,
            StoreError::MisuseError(_) => exit_codes::MISUSE,
            StoreError::PersistError(_) => exit_codes::PERSIST_FAILURE,
            StoreError::DocumentError(_) => exit_codes::DOCUMENT_FAILURE,
            StoreError::DirectiveError(_) | StoreError::QueryError(_) => {
                exit_codes::INVALID_INPUT
            }
        }
    }
}

/// Result type alias for docstore operations.
pub type Result<T> = std::result::Result<T, StoreError>;
