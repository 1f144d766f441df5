use std::fmt;

use gws_store::StoreError;

use crate::listener::ListenerError;

/// The folder mutation a listener was being notified about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListOperation {
    Create,
    Delete,
    Rename,
}

impl fmt::Display for ListOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

/// Errors from folder list operations.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// The remote mutation or query failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A listener failed after the remote mutation was committed.
    ///
    /// `notified` listeners completed before the failing one; the rest
    /// were skipped.
    #[error("{operation} of {path} committed, but listener notification failed after {notified} listener(s): {source}")]
    Listener {
        operation: ListOperation,
        path: String,
        notified: usize,
        #[source]
        source: ListenerError,
    },

    /// Two folders claim to be the same owner's default for one type.
    #[error("{owner} has two default {folder_type} folders: {first} and {second}")]
    DuplicateDefault {
        owner: String,
        folder_type: String,
        first: String,
        second: String,
    },

    /// The folder is not in the list.
    #[error("folder not found: {0}")]
    FolderNotFound(String),
}

impl ListError {
    /// Whether the remote mutation was committed despite this error.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Listener { .. })
    }
}

/// Result alias for list operations.
pub type ListResult<T> = Result<T, ListError>;
