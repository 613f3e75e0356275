use thiserror::Error;

/// Failure of a single price extraction. The cycle treats every variant the
/// same way: the link is dropped from this cycle and retried on the next.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Price element not found: {selector}")]
    NotFound { selector: String },

    #[error("Could not parse price from '{text}'")]
    Parse { text: String },

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Extraction timed out after {0}s")]
    Timeout(u64),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("Storage write conflict: {0}")]
    StorageWriteConflict(String),

    #[error("Transport error: {notifier}: {message}")]
    Transport { notifier: String, message: String },

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn transport(notifier: impl Into<String>, message: impl ToString) -> Self {
        AppError::Transport {
            notifier: notifier.into(),
            message: message.to_string(),
        }
    }

    /// Sort a write-side sqlx error into conflict or unavailable.
    ///
    /// SQLite reports lock contention as SQLITE_BUSY (5) or SQLITE_LOCKED (6),
    /// including the extended codes that share those low bits.
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let is_lock = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| matches!(code & 0xff, 5 | 6))
                .unwrap_or(false);
            if is_lock {
                return AppError::StorageWriteConflict(db_err.message().to_string());
            }
        }
        AppError::StorageUnavailable(err)
    }

    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::StorageUnavailable(_) | AppError::StorageWriteConflict(_)
        )
    }
}
