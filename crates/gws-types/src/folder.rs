use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Annotation key that carries the folder type on the remote store.
pub const ANNOTATION_FOLDER_TYPE: &str = "/shared/vendor/kolab/folder-type";

/// Prefix of the MIME type that tags a typed payload part.
pub const MIME_TYPE_PREFIX: &str = "application/x-vnd.kolab.";

/// Suffix marking a folder as the default folder of its type.
const DEFAULT_SUFFIX: &str = "default";

/// The groupware record type stored in a folder or document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ObjectType {
    Contact,
    DistributionList,
    Event,
    Note,
    Task,
    Journal,
    Configuration,
    Mail,
    /// An application-defined type without a dedicated variant.
    Other(String),
}

impl ObjectType {
    /// Parse a type name as used in annotations and MIME types.
    pub fn parse(name: &str) -> Self {
        match name {
            "contact" => Self::Contact,
            "distribution-list" => Self::DistributionList,
            "event" => Self::Event,
            "note" => Self::Note,
            "task" => Self::Task,
            "journal" => Self::Journal,
            "configuration" => Self::Configuration,
            "mail" => Self::Mail,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Contact => "contact",
            Self::DistributionList => "distribution-list",
            Self::Event => "event",
            Self::Note => "note",
            Self::Task => "task",
            Self::Journal => "journal",
            Self::Configuration => "configuration",
            Self::Mail => "mail",
            Self::Other(name) => name,
        }
    }

    /// MIME type of the payload part holding objects of this type.
    pub fn mime_type(&self) -> String {
        format!("{MIME_TYPE_PREFIX}{}", self.name())
    }

    /// Recover the object type from a payload MIME type.
    ///
    /// Returns `None` for MIME types outside the groupware vendor tree.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        let name = mime.strip_prefix(MIME_TYPE_PREFIX)?;
        if name.is_empty() {
            return None;
        }
        Some(Self::parse(name))
    }

    /// Every type with a dedicated variant that carries typed payloads.
    pub fn groupware() -> [Self; 7] {
        [
            Self::Contact,
            Self::DistributionList,
            Self::Event,
            Self::Note,
            Self::Task,
            Self::Journal,
            Self::Configuration,
        ]
    }

    /// Mail folders hold plain messages; they never carry typed payloads.
    pub fn is_groupware(&self) -> bool {
        !matches!(self, Self::Mail)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ObjectType> for String {
    fn from(value: ObjectType) -> Self {
        value.name().to_string()
    }
}

impl From<String> for ObjectType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Parsed value of the folder-type annotation.
///
/// The annotation has the form `<type>` or `<type>.default`; the suffix marks
/// the folder as the owner's default folder for that type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderType {
    pub object_type: ObjectType,
    pub is_default: bool,
}

impl FolderType {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            is_default: false,
        }
    }

    pub fn default_of(object_type: ObjectType) -> Self {
        Self {
            object_type,
            is_default: true,
        }
    }

    /// Parse an annotation value such as `"event"` or `"contact.default"`.
    pub fn parse(annotation: &str) -> Result<Self, TypeError> {
        let annotation = annotation.trim();
        if annotation.is_empty() {
            return Err(TypeError::InvalidFolderType(annotation.to_string()));
        }
        let (name, suffix) = match annotation.split_once('.') {
            Some((name, suffix)) => (name, Some(suffix)),
            None => (annotation, None),
        };
        if name.is_empty() {
            return Err(TypeError::InvalidFolderType(annotation.to_string()));
        }
        Ok(Self {
            object_type: ObjectType::parse(name),
            is_default: suffix == Some(DEFAULT_SUFFIX),
        })
    }

    /// The annotation value this folder type is stored as.
    pub fn to_annotation(&self) -> String {
        if self.is_default {
            format!("{}.{DEFAULT_SUFFIX}", self.object_type.name())
        } else {
            self.object_type.name().to_string()
        }
    }
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_annotation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_names_roundtrip() {
        for t in [
            ObjectType::Contact,
            ObjectType::DistributionList,
            ObjectType::Event,
            ObjectType::Note,
            ObjectType::Task,
            ObjectType::Journal,
            ObjectType::Configuration,
            ObjectType::Mail,
            ObjectType::Other("h-prefs".into()),
        ] {
            assert_eq!(ObjectType::parse(t.name()), t);
        }
    }

    #[test]
    fn mime_type_mapping() {
        assert_eq!(
            ObjectType::Event.mime_type(),
            "application/x-vnd.kolab.event"
        );
        assert_eq!(
            ObjectType::from_mime_type("Application/X-Vnd.Kolab.Note"),
            Some(ObjectType::Note)
        );
        assert_eq!(ObjectType::from_mime_type("text/plain"), None);
        assert_eq!(ObjectType::from_mime_type("application/x-vnd.kolab."), None);
    }

    #[test]
    fn folder_type_plain() {
        let ft = FolderType::parse("event").unwrap();
        assert_eq!(ft.object_type, ObjectType::Event);
        assert!(!ft.is_default);
        assert_eq!(ft.to_annotation(), "event");
    }

    #[test]
    fn folder_type_default() {
        let ft = FolderType::parse("contact.default").unwrap();
        assert_eq!(ft, FolderType::default_of(ObjectType::Contact));
        assert_eq!(ft.to_annotation(), "contact.default");
    }

    #[test]
    fn folder_type_unknown_suffix_is_not_default() {
        let ft = FolderType::parse("mail.sentitems").unwrap();
        assert_eq!(ft.object_type, ObjectType::Mail);
        assert!(!ft.is_default);
    }

    #[test]
    fn folder_type_rejects_empty() {
        assert!(FolderType::parse("").is_err());
        assert!(FolderType::parse(".default").is_err());
    }

    #[test]
    fn object_type_serializes_as_name() {
        let json = serde_json::to_string(&ObjectType::Task).unwrap();
        assert_eq!(json, "\"task\"");
        let parsed: ObjectType = serde_json::from_str("\"x-custom\"").unwrap();
        assert_eq!(parsed, ObjectType::Other("x-custom".into()));
    }
}
