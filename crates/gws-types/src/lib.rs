//! Foundation types for groupware storage.
//!
//! This crate provides the shared vocabulary used by every other `gws-*`
//! crate: identifiers handed out by the remote folder store, the groupware
//! object types stored inside folders, and the ownership scopes a folder path
//! can be classified into.
//!
//! # Key Types
//!
//! - [`BackendId`] -- per-folder, per-poll position of a stored document
//! - [`ObjectType`] -- groupware record type (event, contact, note, task, ...)
//! - [`FolderType`] -- parsed folder-type annotation (`"event.default"`)
//! - [`NamespaceKind`] -- personal / other-user / shared ownership scope
//! - [`HistoryAction`] -- add / modify / delete history event

pub mod error;
pub mod folder;
pub mod history;
pub mod id;
pub mod namespace;

pub use error::TypeError;
pub use folder::{FolderType, ObjectType, ANNOTATION_FOLDER_TYPE, MIME_TYPE_PREFIX};
pub use history::HistoryAction;
pub use id::BackendId;
pub use namespace::NamespaceKind;
