//! A single namespace: scope, path prefix, and hierarchy delimiter.

use gws_types::NamespaceKind;
use serde::{Deserialize, Serialize};

use crate::error::{NamespaceError, Result};

/// Separator used when rendering a folder path as a readable title.
const TITLE_SEPARATOR: &str = ":";

/// Serialized form of a [`NamespaceElement`].
///
/// Deserializing goes through [`NamespaceElement::new`] so the trailing
/// delimiter invariant also holds for configured and cached elements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub kind: NamespaceKind,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    '/'
}

/// One namespace of the remote folder tree.
///
/// The prefix never ends with the delimiter: `"INBOX/"` is stored as
/// `"INBOX"`. Matching is a plain prefix test on the full folder path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ElementSpec", into = "ElementSpec")]
pub struct NamespaceElement {
    kind: NamespaceKind,
    prefix: String,
    delimiter: char,
}

impl NamespaceElement {
    /// Create an element, stripping one trailing delimiter from `prefix`.
    pub fn new(kind: NamespaceKind, prefix: impl Into<String>, delimiter: char) -> Self {
        let mut prefix = prefix.into();
        if prefix.ends_with(delimiter) {
            prefix.pop();
        }
        Self {
            kind,
            prefix,
            delimiter,
        }
    }

    pub fn personal(prefix: impl Into<String>, delimiter: char) -> Self {
        Self::new(NamespaceKind::Personal, prefix, delimiter)
    }

    pub fn other(prefix: impl Into<String>, delimiter: char) -> Self {
        Self::new(NamespaceKind::Other, prefix, delimiter)
    }

    pub fn shared(prefix: impl Into<String>, delimiter: char) -> Self {
        Self::new(NamespaceKind::Shared, prefix, delimiter)
    }

    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Whether `path` lies inside this namespace.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// The part of `path` below the namespace prefix.
    ///
    /// A path equal to the prefix yields the empty string. Paths outside the
    /// namespace are returned unchanged.
    pub fn relative<'a>(&self, path: &'a str) -> &'a str {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) if self.prefix.is_empty() => rest,
            Some(rest) => rest.strip_prefix(self.delimiter).unwrap_or(rest),
            None => path,
        }
    }

    /// The delimiter-separated segments below the namespace prefix.
    pub fn subpath_segments(&self, path: &str) -> Vec<String> {
        let relative = self.relative(path);
        if relative.is_empty() {
            return Vec::new();
        }
        relative.split(self.delimiter).map(str::to_string).collect()
    }

    /// The namespace-relative path, joined with the namespace delimiter.
    pub fn subpath(&self, path: &str) -> String {
        self.subpath_segments(path)
            .join(self.delimiter.to_string().as_str())
    }

    /// A readable title: the relative segments joined with `:`.
    pub fn title(&self, path: &str) -> String {
        self.subpath_segments(path).join(TITLE_SEPARATOR)
    }

    /// The first segment below the prefix, if any.
    pub fn first_segment(&self, path: &str) -> Option<String> {
        self.subpath_segments(path).into_iter().next()
    }

    /// Join relative segments back into a namespace-relative path.
    ///
    /// This is the inverse of [`Self::subpath_segments`]:
    /// `generate_name(subpath_segments(p)) == relative(p)` for every path
    /// inside the namespace.
    pub fn generate_name<S: AsRef<str>>(&self, segments: &[S]) -> Result<String> {
        let mut name = String::new();
        for (index, segment) in segments.iter().enumerate() {
            let segment = segment.as_ref();
            if segment.contains(self.delimiter) {
                return Err(NamespaceError::SegmentContainsDelimiter {
                    segment: segment.to_string(),
                    delimiter: self.delimiter,
                });
            }
            if index > 0 {
                name.push(self.delimiter);
            }
            name.push_str(segment);
        }
        Ok(name)
    }

    /// The full folder path for relative segments, prefix included.
    pub fn qualified_name<S: AsRef<str>>(&self, segments: &[S]) -> Result<String> {
        let relative = self.generate_name(segments)?;
        Ok(self.qualify(&relative))
    }

    /// The parent folder of `path`, or `None` at the namespace root.
    pub fn parent(&self, path: &str) -> Option<String> {
        let segments = self.subpath_segments(path);
        match segments.len() {
            0 => None,
            1 if self.prefix.is_empty() => None,
            1 => Some(self.prefix.clone()),
            n => {
                let relative = segments[..n - 1].join(self.delimiter.to_string().as_str());
                Some(self.qualify(&relative))
            }
        }
    }

    fn qualify(&self, relative: &str) -> String {
        match (self.prefix.is_empty(), relative.is_empty()) {
            (true, _) => relative.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}{}{}", self.prefix, self.delimiter, relative),
        }
    }
}

impl From<ElementSpec> for NamespaceElement {
    fn from(spec: ElementSpec) -> Self {
        Self::new(spec.kind, spec.prefix, spec.delimiter)
    }
}

impl From<NamespaceElement> for ElementSpec {
    fn from(element: NamespaceElement) -> Self {
        Self {
            kind: element.kind,
            prefix: element.prefix,
            delimiter: element.delimiter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbox() -> NamespaceElement {
        NamespaceElement::personal("INBOX/", '/')
    }

    #[test]
    fn trailing_delimiter_is_stripped() {
        assert_eq!(inbox().prefix(), "INBOX");
        assert_eq!(NamespaceElement::other("user", '/').prefix(), "user");
        assert_eq!(NamespaceElement::shared("", '/').prefix(), "");
    }

    #[test]
    fn matches_is_prefix_test() {
        let ns = inbox();
        assert!(ns.matches("INBOX"));
        assert!(ns.matches("INBOX/Calendar"));
        assert!(!ns.matches("user/john/Calendar"));
        assert!(NamespaceElement::shared("", '/').matches("anything"));
    }

    #[test]
    fn title_and_subpath() {
        let ns = inbox();
        assert_eq!(ns.title("INBOX/Calendar"), "Calendar");
        assert_eq!(ns.title("INBOX/Calendar/Work"), "Calendar:Work");
        assert_eq!(ns.subpath("INBOX/Calendar/Work"), "Calendar/Work");
    }

    #[test]
    fn path_equal_to_prefix_is_empty() {
        let ns = inbox();
        assert_eq!(ns.title("INBOX"), "");
        assert_eq!(ns.subpath("INBOX"), "");
        assert!(ns.subpath_segments("INBOX").is_empty());
    }

    #[test]
    fn custom_delimiter() {
        let ns = NamespaceElement::personal("INBOX.", '.');
        assert_eq!(ns.prefix(), "INBOX");
        assert_eq!(ns.subpath("INBOX.Contacts.Family"), "Contacts.Family");
        assert_eq!(ns.title("INBOX.Contacts.Family"), "Contacts:Family");
    }

    #[test]
    fn generate_name_inverts_subpath() {
        let ns = inbox();
        for path in ["INBOX/Calendar", "INBOX/a/b/c", "INBOX", "INBOX/x y/z"] {
            let segments = ns.subpath_segments(path);
            assert_eq!(ns.generate_name(&segments[..]).unwrap(), ns.relative(path));
        }
    }

    #[test]
    fn qualified_name_restores_full_path() {
        let ns = inbox();
        let segments = ns.subpath_segments("INBOX/Notes/Private");
        assert_eq!(ns.qualified_name(&segments[..]).unwrap(), "INBOX/Notes/Private");

        let shared = NamespaceElement::shared("", '/');
        assert_eq!(shared.qualified_name(&["shared", "Tasks"]).unwrap(), "shared/Tasks");
    }

    #[test]
    fn generate_name_rejects_embedded_delimiter() {
        let err = inbox().generate_name(&["a/b"]).unwrap_err();
        assert!(matches!(err, NamespaceError::SegmentContainsDelimiter { .. }));
    }

    #[test]
    fn parent_paths() {
        let ns = inbox();
        assert_eq!(ns.parent("INBOX/Calendar/Work").as_deref(), Some("INBOX/Calendar"));
        assert_eq!(ns.parent("INBOX/Calendar").as_deref(), Some("INBOX"));
        assert_eq!(ns.parent("INBOX"), None);

        let shared = NamespaceElement::shared("", '/');
        assert_eq!(shared.parent("Public"), None);
        assert_eq!(shared.parent("Public/Notes").as_deref(), Some("Public"));
    }

    #[test]
    fn deserialize_applies_invariant() {
        let ns: NamespaceElement =
            serde_json::from_str(r#"{"kind":"other","prefix":"user/","delimiter":"/"}"#).unwrap();
        assert_eq!(ns.prefix(), "user");
        assert_eq!(ns.kind(), NamespaceKind::Other);

        let defaulted: NamespaceElement = serde_json::from_str(r#"{"kind":"shared"}"#).unwrap();
        assert_eq!(defaulted.prefix(), "");
        assert_eq!(defaulted.delimiter(), '/');
    }
}
