//! Error types for ryt-sig

use std::sync::Arc;
use thiserror::Error;

/// Main error type for signature operations
#[derive(Debug, Error)]
pub enum SigError {
    #[error("Could not extract functions")]
    ExtractionFailed,

    #[error("Unbalanced input: {0}")]
    UnbalancedInput(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),

    #[error("Fetch of {url} returned status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    /// Error produced by a coalesced extraction and handed to every waiter
    #[error(transparent)]
    Shared(Arc<SigError>),
}

/// Coarse error classification, independent of how the error was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Extraction,
    Unbalanced,
    Fetch,
    Execution,
    Format,
    Other,
}

impl SigError {
    /// Unwrap an error that may have been shared between cache waiters
    pub fn from_shared(err: Arc<SigError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(SigError::Shared)
    }

    /// Classify the error, looking through shared wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigError::ExtractionFailed => ErrorKind::Extraction,
            SigError::UnbalancedInput(_) => ErrorKind::Unbalanced,
            SigError::FetchFailed(_) | SigError::FetchStatus { .. } | SigError::IoError(_) => {
                ErrorKind::Fetch
            }
            SigError::ExecutionFailed(_) => ErrorKind::Execution,
            SigError::FormatError(_) | SigError::UrlError(_) => ErrorKind::Format,
            SigError::JsonError(_) | SigError::RegexError(_) => ErrorKind::Other,
            SigError::Shared(inner) => inner.kind(),
        }
    }

    /// Check if error aborts a whole batch rather than a single format
    pub fn is_fatal_to_batch(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Extraction | ErrorKind::Unbalanced | ErrorKind::Fetch
        )
    }
}
