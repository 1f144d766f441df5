use std::collections::BTreeMap;
use std::fmt;

use gws_types::{BackendId, ObjectType};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Parsed object fields. Nested elements are JSON objects, repeated
/// elements are arrays, and leaf values are strings.
///
/// Values are strings only. Engines reject numbers and booleans on save
/// rather than turning them into strings.
pub type ObjectData = BTreeMap<String, serde_json::Value>;

/// Why a payload could not be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The document has no part carrying a typed payload.
    MissingKolabPart,
    /// The payload part exists but could not be processed.
    InvalidKolabPart,
    /// The payload has no uid.
    MissingIdentity,
    /// The payload lacks a field its type requires.
    MissingField,
    /// The payload is not well-formed.
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingKolabPart => "missing payload part",
            Self::InvalidKolabPart => "invalid payload part",
            Self::MissingIdentity => "missing identity",
            Self::MissingField => "missing field",
            Self::Malformed => "malformed payload",
        };
        f.write_str(s)
    }
}

/// Marker attached to an object whose payload could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ParseFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl From<&FormatError> for ParseFailure {
    fn from(err: &FormatError) -> Self {
        let kind = match err {
            FormatError::MissingUid => FailureKind::MissingIdentity,
            FormatError::MissingField(_) => FailureKind::MissingField,
            FormatError::Malformed(_) => FailureKind::Malformed,
            _ => FailureKind::InvalidKolabPart,
        };
        Self::new(kind, err.to_string())
    }
}

/// The content of one object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Structured fields produced by a format engine.
    Parsed(ObjectData),
    /// Bytes passed through unchanged by the raw codec.
    Raw(Vec<u8>),
    /// Parsing failed; the original bytes are kept for inspection.
    Fallback { bytes: Vec<u8>, error: ParseFailure },
}

impl Payload {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn data(&self) -> Option<&ObjectData> {
        match self {
            Self::Parsed(data) => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            Self::Fallback { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The uid stored in parsed data, if any.
    pub fn uid(&self) -> Option<&str> {
        self.data()?.get("uid")?.as_str()
    }
}

/// One object of a folder, as cached by the data layer.
///
/// Records are replaced wholesale when the object changes; they are never
/// mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub backend_id: BackendId,
    /// Stable logical id. `None` when the payload could not be parsed.
    pub uid: Option<String>,
    pub object_type: ObjectType,
    pub payload: Payload,
    /// Part id of the payload inside its document, when one was located.
    pub mime_part_id: Option<String>,
}

impl ObjectRecord {
    pub fn is_fallback(&self) -> bool {
        self.payload.is_fallback()
    }
}
