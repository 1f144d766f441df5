use thiserror::Error;

/// Errors from stamp comparison and decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StampError {
    /// Two stamps of different kinds cannot be diffed.
    #[error("cannot compare a {this} stamp with a {other} stamp")]
    KindMismatch {
        this: &'static str,
        other: &'static str,
    },

    /// The persisted token could not be decoded.
    #[error("invalid stamp token: {0}")]
    Decode(String),

    /// The stamp could not be encoded.
    #[error("stamp encoding failed: {0}")]
    Encode(String),
}

/// Result alias for stamp operations.
pub type StampResult<T> = Result<T, StampError>;
