use std::sync::Arc;

use gws_types::ObjectType;
use tracing::debug;

use crate::data::{ParseFailure, Payload};
use crate::engine::FormatEngine;
use crate::error::{FormatError, FormatResult};

/// Codec driven by a format engine.
#[derive(Clone)]
pub struct FormatCodec {
    engine: Arc<dyn FormatEngine>,
}

impl FormatCodec {
    pub fn new(engine: Arc<dyn FormatEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn FormatEngine {
        self.engine.as_ref()
    }
}

impl std::fmt::Debug for FormatCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatCodec")
            .field("object_type", self.engine.object_type())
            .finish()
    }
}

/// Strategy converting between payload bytes and [`Payload`]s.
///
/// `load` never fails: format errors become [`Payload::Fallback`] with the
/// original bytes. `save` is strict and returns every error.
#[derive(Clone, Debug)]
pub enum ObjectCodec {
    /// Identity in both directions.
    Raw,
    Format(FormatCodec),
}

impl ObjectCodec {
    pub fn format(engine: Arc<dyn FormatEngine>) -> Self {
        Self::Format(FormatCodec::new(engine))
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw)
    }

    /// The object type the codec was built for. Raw codecs have none.
    pub fn object_type(&self) -> Option<&ObjectType> {
        match self {
            Self::Raw => None,
            Self::Format(codec) => Some(codec.engine.object_type()),
        }
    }

    pub fn load(&self, bytes: Vec<u8>) -> Payload {
        match self {
            Self::Raw => Payload::Raw(bytes),
            Self::Format(codec) => match codec.engine.load(&bytes) {
                Ok(data) => Payload::Parsed(data),
                Err(e) => {
                    let error = ParseFailure::from(&e);
                    debug!(error = %error, "payload could not be parsed; keeping raw bytes");
                    Payload::Fallback { bytes, error }
                }
            },
        }
    }

    /// Serialize `payload`, passing `previous` payload bytes to the engine
    /// so unknown fields survive.
    pub fn save(&self, payload: &Payload, previous: Option<&[u8]>) -> FormatResult<Vec<u8>> {
        match (self, payload) {
            (Self::Raw, Payload::Raw(bytes)) => Ok(bytes.clone()),
            (Self::Raw, Payload::Parsed(_)) => Err(FormatError::Unsavable(
                "structured data needs a format codec".into(),
            )),
            (Self::Format(codec), Payload::Parsed(data)) => codec.engine.save(data, previous),
            (Self::Format(_), Payload::Raw(_)) => Err(FormatError::Unsavable(
                "raw bytes cannot be written through a format codec".into(),
            )),
            (_, Payload::Fallback { error, .. }) => Err(FormatError::Unsavable(format!(
                "object failed to parse ({error}) and cannot be written back"
            ))),
        }
    }
}
