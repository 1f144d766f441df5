use std::collections::BTreeMap;

use gws_stamp::ChangeStamp;
use gws_types::BackendId;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::structure::MessageStructure;

/// Counters reported by a folder status call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStatus {
    /// Generation of the folder's id space.
    pub uidvalidity: u64,
    /// The id the next appended message will receive.
    pub uidnext: u64,
    /// Highest modification sequence, when the server tracks one.
    pub highest_modseq: Option<u64>,
}

/// Remote hierarchical folder store.
///
/// All implementations must satisfy these invariants:
/// - Backend ids within a folder are unique and strictly increasing in
///   append order, for as long as the folder's uidvalidity is unchanged.
/// - `append` never reuses an id below the current `uidnext`.
/// - Folder paths are opaque strings; the store does not interpret
///   namespaces or delimiters.
pub trait RemoteStore: Send + Sync {
    /// All folder paths, sorted.
    fn list(&self) -> StoreResult<Vec<String>>;

    fn create(&self, path: &str) -> StoreResult<()>;

    fn delete(&self, path: &str) -> StoreResult<()>;

    fn rename(&self, old: &str, new: &str) -> StoreResult<()>;

    /// Set a folder annotation, replacing any previous value.
    fn set_annotation(&self, path: &str, key: &str, value: &str) -> StoreResult<()>;

    fn get_annotation(&self, path: &str, key: &str) -> StoreResult<Option<String>>;

    /// The value of `key` on every folder that carries it, keyed by path.
    fn list_annotation(&self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    fn status(&self, path: &str) -> StoreResult<FolderStatus>;

    /// Backend ids of all messages in the folder, ascending.
    fn search(&self, path: &str) -> StoreResult<Vec<BackendId>>;

    /// Part trees for a batch of messages.
    ///
    /// Ids that no longer exist are omitted from the result. A message that
    /// is not valid MIME is reported as [`MessageStructure::opaque`] so one
    /// document never fails the batch.
    fn fetch_structure(
        &self,
        path: &str,
        ids: &[BackendId],
    ) -> StoreResult<BTreeMap<BackendId, MessageStructure>>;

    /// The complete raw document.
    fn fetch_content(&self, path: &str, id: BackendId) -> StoreResult<Vec<u8>>;

    /// The decoded body of a single MIME part.
    fn fetch_part(&self, path: &str, id: BackendId, part_id: &str) -> StoreResult<Vec<u8>>;

    /// Append a document. Returns its backend id when the server reports it.
    fn append(&self, path: &str, content: &[u8]) -> StoreResult<Option<BackendId>>;

    /// Flag messages as deleted and expunge them.
    fn delete_messages(&self, path: &str, ids: &[BackendId]) -> StoreResult<()>;

    /// Move a message into another folder.
    fn move_message(&self, path: &str, id: BackendId, target: &str) -> StoreResult<()>;

    /// A fresh change stamp: one status call plus one search.
    ///
    /// Servers that report a modification sequence yield a modseq stamp.
    fn stamp(&self, path: &str) -> StoreResult<ChangeStamp> {
        let status = self.status(path)?;
        let ids = self.search(path)?;
        Ok(match status.highest_modseq {
            Some(modseq) => ChangeStamp::modseq(status.uidvalidity, status.uidnext, modseq, ids),
            None => ChangeStamp::uids(status.uidvalidity, status.uidnext, ids),
        })
    }
}
