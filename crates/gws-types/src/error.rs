use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid backend id: {0}")]
    InvalidBackendId(String),

    #[error("invalid folder type annotation: {0:?}")]
    InvalidFolderType(String),

    #[error("unknown namespace kind: {0}")]
    UnknownNamespaceKind(String),
}
