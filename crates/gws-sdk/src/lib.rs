//! High-level API for groupware storage.
//!
//! A [`Storage`] wraps one remote folder store. It answers folder list
//! queries from a listener-maintained cache and hands out [`FolderHandle`]s,
//! whose [`DataQuery`] caches the folder's objects by backend id and keeps
//! them current with cheap stamp-based synchronization passes.
//!
//! All collaborators are passed in through a [`StorageContext`]; there is
//! no global registry. Passes run only when the caller asks for them.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gws_sdk::{Storage, StorageConfig, StorageContext};
//! use gws_store::InMemoryRemoteStore;
//!
//! # fn main() -> gws_sdk::SdkResult<()> {
//! let config = StorageConfig::for_user("john@example.org");
//! let context = StorageContext::new(config, Arc::new(InMemoryRemoteStore::new()))?;
//! let storage = Storage::new(context);
//!
//! let mut notes = storage.get_folder("INBOX/Notes")?.get_data()?;
//! let report = notes.synchronize()?;
//! println!("{:?}: {} objects", report.kind, notes.objects()?.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod folder;
pub mod query;
pub mod storage;

pub use config::StorageConfig;
pub use context::StorageContext;
pub use data::{DataQuery, SyncKind, SyncReport};
pub use error::{SdkError, SdkResult};
pub use folder::FolderHandle;
pub use query::{HistoryQuery, QueryKind};
pub use storage::Storage;

// Re-export key types
pub use gws_format::{ObjectData, ObjectRecord, ParseFailure, Payload};
pub use gws_history::{HistoryFilter, TimestampOp};
pub use gws_list::{DefaultHandling, FolderInfo};
pub use gws_types::{BackendId, FolderType, HistoryAction, NamespaceKind, ObjectType};
