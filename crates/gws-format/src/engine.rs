use std::sync::Arc;

use gws_types::ObjectType;
use serde::{Deserialize, Serialize};

use crate::data::ObjectData;
use crate::error::{FormatError, FormatResult};
use crate::xml::XmlFormat;

/// Parses and serializes the typed payload of one object type.
///
/// `save` receives the previous payload bytes, when the object already
/// exists, so fields the engine does not know about survive a round trip.
pub trait FormatEngine: Send + Sync {
    fn object_type(&self) -> &ObjectType;

    fn load(&self, bytes: &[u8]) -> FormatResult<ObjectData>;

    fn save(&self, data: &ObjectData, previous: Option<&[u8]>) -> FormatResult<Vec<u8>>;
}

/// Options shared by all engines a factory creates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatParams {
    /// Payload format version written into new documents.
    pub version: String,
    /// Written as `product-id` on every save.
    pub product_id: String,
}

impl Default for FormatParams {
    fn default() -> Self {
        Self {
            version: "1.0".into(),
            product_id: concat!("gws-format/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Creates format engines by name.
#[derive(Clone, Debug, Default)]
pub struct FormatFactory;

impl FormatFactory {
    /// Format names this factory understands.
    pub const FORMATS: &'static [&'static str] = &["xml"];

    pub fn new() -> Self {
        Self
    }

    pub fn create(
        &self,
        kind: &str,
        object_type: &ObjectType,
        params: &FormatParams,
    ) -> FormatResult<Arc<dyn FormatEngine>> {
        match kind {
            "xml" => Ok(Arc::new(XmlFormat::new(object_type.clone(), params.clone()))),
            other => Err(FormatError::UnsupportedFormat(other.to_string())),
        }
    }
}
