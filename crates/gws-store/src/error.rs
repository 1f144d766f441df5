use gws_types::BackendId;

/// Errors from remote store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The remote store could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The folder does not exist.
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    /// A folder with this path already exists.
    #[error("folder already exists: {0}")]
    FolderExists(String),

    /// No message with this backend id exists in the folder.
    #[error("message {id} not found in {path}")]
    MessageNotFound { path: String, id: BackendId },

    /// The message has no MIME part with this id.
    #[error("part {part_id} of message {id} not found in {path}")]
    PartNotFound {
        path: String,
        id: BackendId,
        part_id: String,
    },

    /// A stored document could not be parsed as a MIME message.
    #[error("message parse error: {0}")]
    Parse(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
