//! Ordered namespace classification.

use gws_types::NamespaceKind;
use serde::{Deserialize, Serialize};

use crate::element::NamespaceElement;
use crate::error::{NamespaceError, Result};

/// Classifies folder paths into namespaces.
///
/// Elements are tested in order and the first match wins, so more specific
/// prefixes must be listed before broader ones. When nothing matches, the
/// shared catch-all element is returned: it always matches, regardless of
/// its own prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceResolver {
    user: String,
    elements: Vec<NamespaceElement>,
    catch_all: NamespaceElement,
}

impl NamespaceResolver {
    /// Create a resolver for `user` with an explicit catch-all element.
    pub fn new(
        user: impl Into<String>,
        elements: Vec<NamespaceElement>,
        catch_all: NamespaceElement,
    ) -> Result<Self> {
        if catch_all.kind() != NamespaceKind::Shared {
            return Err(NamespaceError::CatchAllNotShared(catch_all.kind().to_string()));
        }
        Ok(Self {
            user: user.into(),
            elements,
            catch_all,
        })
    }

    /// The standard layout: personal `INBOX`, other users under `user`, and
    /// an empty-prefix shared catch-all, all delimited by `/`.
    pub fn fixed(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            elements: vec![
                NamespaceElement::personal("INBOX", '/'),
                NamespaceElement::other("user", '/'),
            ],
            catch_all: NamespaceElement::shared("", '/'),
        }
    }

    /// Build a resolver from a configured element list.
    ///
    /// The first shared element becomes the catch-all; without one, an
    /// empty-prefix shared element delimited by `/` is used.
    pub fn from_elements(user: impl Into<String>, mut elements: Vec<NamespaceElement>) -> Self {
        let catch_all = match elements
            .iter()
            .position(|e| e.kind() == NamespaceKind::Shared)
        {
            Some(index) => elements.remove(index),
            None => NamespaceElement::shared("", '/'),
        };
        Self {
            user: user.into(),
            elements,
            catch_all,
        }
    }

    /// The authenticated user personal folders belong to.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The ordered, non-catch-all elements.
    pub fn elements(&self) -> &[NamespaceElement] {
        &self.elements
    }

    pub fn catch_all(&self) -> &NamespaceElement {
        &self.catch_all
    }

    /// The namespace `path` belongs to.
    pub fn classify(&self, path: &str) -> &NamespaceElement {
        self.elements
            .iter()
            .find(|element| element.matches(path))
            .unwrap_or(&self.catch_all)
    }

    pub fn kind(&self, path: &str) -> NamespaceKind {
        self.classify(path).kind()
    }

    /// The owner of the folder at `path`.
    ///
    /// Personal folders belong to the configured user. Other-user folders
    /// belong to the first segment below the prefix, qualified with the
    /// configured user's mail domain when it carries none. Shared folders
    /// report their first segment below the prefix.
    pub fn owner(&self, path: &str) -> Option<String> {
        let element = self.classify(path);
        match element.kind() {
            NamespaceKind::Personal => Some(self.user.clone()),
            NamespaceKind::Other => {
                let owner = element.first_segment(path)?;
                if owner.contains('@') {
                    return Some(owner);
                }
                match self.user.split_once('@') {
                    Some((_, domain)) if !domain.is_empty() => Some(format!("{owner}@{domain}")),
                    _ => Some(owner),
                }
            }
            NamespaceKind::Shared => element.first_segment(path),
        }
    }

    pub fn title(&self, path: &str) -> String {
        self.classify(path).title(path)
    }

    pub fn subpath(&self, path: &str) -> String {
        self.classify(path).subpath(path)
    }

    pub fn subpath_segments(&self, path: &str) -> Vec<String> {
        self.classify(path).subpath_segments(path)
    }

    pub fn parent(&self, path: &str) -> Option<String> {
        self.classify(path).parent(path)
    }

    /// The first namespace of the given kind, falling back to the catch-all.
    pub fn element_of(&self, kind: NamespaceKind) -> &NamespaceElement {
        self.elements
            .iter()
            .find(|element| element.kind() == kind)
            .unwrap_or(&self.catch_all)
    }

    /// The full folder path for `segments` inside the first namespace of
    /// `kind`.
    pub fn qualified_name<S: AsRef<str>>(&self, kind: NamespaceKind, segments: &[S]) -> Result<String> {
        self.element_of(kind).qualified_name(segments)
    }
}
