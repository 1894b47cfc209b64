//! Unified error types for the journey engine.
//!
//! Store failures carry a stable code:
//! - STORE_001: Event or journey read failed
//! - STORE_002: Journey write failed
//! - STORE_003: Journey delete failed

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Read query failed
    ReadFailed,
    /// STORE_002: Upsert failed
    WriteFailed,
    /// STORE_003: Delete failed
    DeleteFailed,
}

impl StoreErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFailed => "STORE_001",
            Self::WriteFailed => "STORE_002",
            Self::DeleteFailed => "STORE_003",
        }
    }
}

/// Unified error type for the journey engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Event or journey store error with code.
    #[error("[{code}] {message}")]
    Store {
        code: &'static str,
        message: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a store error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::Store {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from the event or journey store.
    ///
    /// A store failure while enumerating work aborts the in-flight run;
    /// failures inside one journey's rebuild are recorded and skipped.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Store { code, .. } => Some(code),
            _ => None,
        }
    }
}
