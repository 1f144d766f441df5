//! Error types for namespace operations.

use thiserror::Error;

/// Errors that can occur while building or using a namespace resolver.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamespaceError {
    /// The catch-all element must be a shared namespace.
    #[error("catch-all namespace must be shared, got {0}")]
    CatchAllNotShared(String),

    /// A path segment contains the namespace delimiter.
    #[error("path segment {segment:?} contains delimiter {delimiter:?}")]
    SegmentContainsDelimiter { segment: String, delimiter: char },
}

/// Convenience type alias for namespace operations.
pub type Result<T> = std::result::Result<T, NamespaceError>;
