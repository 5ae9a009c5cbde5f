use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Structured error shared by the ingestion, storage and retrieval layers.
///
/// `code` is a stable machine-readable identifier (`VECTOR_QUERY_FAILED`,
/// `CONFIG_INVALID`, ...); `details` carries free-form context such as paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    /// Error for a failed filesystem operation on `path`.
    pub fn io(
        code: impl Into<String>,
        message: impl Into<String>,
        path: &Path,
        err: impl fmt::Display,
    ) -> Self {
        Self::new(code, message).with_details(format!("path={}; err={}", path.display(), err))
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(d) = self.details.as_deref() {
            write!(f, " ({d})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
