use gws_store::MessageStructure;
use gws_types::ObjectType;

use crate::data::{FailureKind, ParseFailure};

/// The payload part found inside a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedPart {
    pub part_id: String,
    pub object_type: ObjectType,
}

/// Finds the typed payload part in a document's part tree.
pub struct StructureParser;

impl StructureParser {
    /// Locate the payload of a document stored in a folder of
    /// `folder_type`.
    ///
    /// The part whose MIME type matches the folder type wins. Otherwise the
    /// `X-Kolab-Type` header names the type to look for.
    pub fn locate(
        structure: &MessageStructure,
        folder_type: &ObjectType,
    ) -> Result<LocatedPart, ParseFailure> {
        if let Some(part_id) = Self::find_mime_type(structure, &folder_type.mime_type()) {
            return Ok(LocatedPart {
                part_id,
                object_type: folder_type.clone(),
            });
        }

        let header_type = structure
            .kolab_type
            .as_deref()
            .and_then(ObjectType::from_mime_type);
        if let Some(object_type) = header_type {
            if let Some(part_id) = Self::find_mime_type(structure, &object_type.mime_type()) {
                return Ok(LocatedPart {
                    part_id,
                    object_type,
                });
            }
        }

        Err(ParseFailure::new(
            FailureKind::MissingKolabPart,
            format!("no {} part", folder_type.mime_type()),
        ))
    }

    fn find_mime_type(structure: &MessageStructure, mime: &str) -> Option<String> {
        structure
            .parts()
            .into_iter()
            .find(|part| part.children.is_empty() && part.content_type == mime)
            .map(|part| part.part_id.clone())
    }
}
