//! Remote folder store interface for groupware storage.
//!
//! The engine never speaks a wire protocol itself. Everything it needs from
//! the remote folder store (listing and mutating folders, reading folder
//! status, searching, fetching whole documents or single MIME parts, and
//! appending) goes through the [`RemoteStore`] trait defined here.
//!
//! # Storage Backends
//!
//! - [`InMemoryRemoteStore`] -- folder tree held in memory, for tests and
//!   embedding. It counts calls per primitive and can simulate an
//!   unreachable server.
//!
//! # Design Rules
//!
//! 1. All calls are synchronous, blocking round trips.
//! 2. Backend ids are per-folder and only valid within one uidvalidity.
//! 3. Errors are propagated; the store never retries.

pub mod error;
pub mod memory;
pub mod structure;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryRemoteStore;
pub use structure::{MessageStructure, PartInfo};
pub use traits::{FolderStatus, RemoteStore};
