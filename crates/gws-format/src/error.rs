use gws_store::StoreError;

/// Errors from loading, saving, and enveloping objects.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The payload has no stable logical identity.
    #[error("object has no uid")]
    MissingUid,

    /// A field the object type requires is absent.
    #[error("required field '{0}' is missing")]
    MissingField(String),

    /// The payload is not well-formed.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// No engine is registered under this format name.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The payload variant cannot be written with this codec.
    #[error("cannot save payload: {0}")]
    Unsavable(String),

    /// The MIME envelope could not be built.
    #[error("envelope error: {0}")]
    Envelope(String),

    /// A remote store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for format operations.
pub type FormatResult<T> = Result<T, FormatError>;
