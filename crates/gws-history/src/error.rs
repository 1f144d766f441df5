/// Errors produced by history operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("history uid must not be empty")]
    EmptyUid,

    #[error("history storage error: {0}")]
    Storage(String),
}

/// Result alias for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
