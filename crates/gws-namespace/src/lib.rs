//! Folder namespace classification for groupware storage.
//!
//! A remote folder store partitions its folder tree into namespaces by path
//! prefix: the user's own folders (`INBOX/...`), folders other users shared
//! (`user/<name>/...`), and shared folders that belong to nobody in
//! particular. This crate classifies paths into those scopes and derives the
//! owner, readable title, and namespace-relative subpath of a folder.
//!
//! # Modules
//!
//! - [`element`] -- [`NamespaceElement`]: one prefix/delimiter/scope triple
//! - [`resolver`] -- [`NamespaceResolver`]: ordered classification with a
//!   catch-all shared element
//! - [`error`] -- Error types

pub mod element;
pub mod error;
pub mod resolver;

pub use element::NamespaceElement;
pub use error::{NamespaceError, Result};
pub use resolver::NamespaceResolver;
