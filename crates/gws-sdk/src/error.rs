use gws_types::BackendId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("object not found: {0}")]
    NotFound(String),

    /// A single-result lookup matched more than one object.
    #[error("uid {uid} matches {} objects", .ids.len())]
    Ambiguous { uid: String, ids: Vec<BackendId> },

    #[error("object already exists: {0}")]
    ObjectExists(String),

    #[error("folder {0} has not been synchronized")]
    NotSynchronized(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("store error: {0}")]
    Store(#[from] gws_store::StoreError),

    #[error("list error: {0}")]
    List(#[from] gws_list::ListError),

    #[error("namespace error: {0}")]
    Namespace(#[from] gws_namespace::NamespaceError),

    #[error("stamp error: {0}")]
    Stamp(#[from] gws_stamp::StampError),

    #[error("format error: {0}")]
    Format(#[from] gws_format::FormatError),

    #[error("history error: {0}")]
    History(#[from] gws_history::HistoryError),
}

pub type SdkResult<T> = Result<T, SdkError>;
