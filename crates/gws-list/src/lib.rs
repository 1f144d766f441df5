//! Folder list manipulation for groupware storage.
//!
//! Folders are created, deleted, and renamed only through a
//! [`ListManipulation`] implementation. After the remote mutation succeeds,
//! every registered [`FolderListener`] is notified synchronously, in
//! registration order, so dependent caches never go stale.
//!
//! # Components
//!
//! - [`ListManipulator`] -- performs the remote mutation, then notifies
//! - [`LoggedListManipulator`] -- decorator that traces each mutation
//! - [`FolderListCache`] -- list-index cache kept current as a listener,
//!   answering folder, type, owner, and default-folder queries
//!
//! # Partial failure
//!
//! Notification is fail-fast. When a listener returns an error the remaining
//! listeners are skipped and [`ListError::Listener`] is returned. The remote
//! mutation has already been committed at that point and is not rolled back;
//! the error reports how many listeners completed before the failure.

pub mod cache;
pub mod error;
pub mod listener;
pub mod logged;
pub mod manipulator;

pub use cache::{DefaultHandling, FolderInfo, FolderListCache};
pub use error::{ListError, ListOperation, ListResult};
pub use listener::{FolderListener, ListenerError};
pub use logged::LoggedListManipulator;
pub use manipulator::{ListManipulation, ListManipulator};
