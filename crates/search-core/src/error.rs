use std::fmt;

/// Why a fetch did not produce a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The catalog could not be reached at all
    #[error("catalog unreachable: {0}")]
    Connectivity(String),
    /// The catalog answered with something that is not a valid page
    #[error("malformed catalog response: {0}")]
    Decode(String),
    /// The catalog understood the request and refused it
    #[error("catalog rejected the request: {0}")]
    Server(String),
    #[error("fetch cancelled")]
    Cancelled,
}

/// What the user gets to see about a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NoConnection,
    Generic,
}

impl FetchError {
    /// `None` for cancellation, which is never surfaced.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            FetchError::Connectivity(_) => Some(ErrorCategory::NoConnection),
            FetchError::Decode(_) | FetchError::Server(_) => Some(ErrorCategory::Generic),
            FetchError::Cancelled => None,
        }
    }
}

impl ErrorCategory {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCategory::NoConnection => "No internet connection",
            ErrorCategory::Generic => "Failed loading movies",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("codec: {0}")]
    Codec(#[from] bincode::Error),
    #[error("storage worker stopped: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Caller asked for an item the result list does not have. This is a bug in
/// the caller, not a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("index {index} out of range for {len} items")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}
