use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use gws_types::BackendId;

use crate::error::{StoreError, StoreResult};
use crate::structure::{extract_part, MessageStructure};
use crate::traits::{FolderStatus, RemoteStore};

#[derive(Clone, Debug)]
struct Folder {
    uidvalidity: u64,
    uidnext: u64,
    highest_modseq: u64,
    messages: BTreeMap<BackendId, Vec<u8>>,
    annotations: BTreeMap<String, String>,
}

impl Folder {
    fn new(uidvalidity: u64) -> Self {
        Self {
            uidvalidity,
            uidnext: 1,
            highest_modseq: 1,
            messages: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    fn append(&mut self, content: Vec<u8>) -> BackendId {
        let id = BackendId(self.uidnext);
        self.messages.insert(id, content);
        self.uidnext += 1;
        self.highest_modseq += 1;
        id
    }
}

#[derive(Debug)]
struct State {
    folders: BTreeMap<String, Folder>,
    next_uidvalidity: u64,
}

impl State {
    fn allocate_uidvalidity(&mut self) -> u64 {
        let value = self.next_uidvalidity;
        self.next_uidvalidity += 1;
        value
    }

    fn folder(&self, path: &str) -> StoreResult<&Folder> {
        self.folders
            .get(path)
            .ok_or_else(|| StoreError::FolderNotFound(path.to_string()))
    }

    fn folder_mut(&mut self, path: &str) -> StoreResult<&mut Folder> {
        self.folders
            .get_mut(path)
            .ok_or_else(|| StoreError::FolderNotFound(path.to_string()))
    }
}

/// In-memory remote folder store.
///
/// Intended for tests and embedding. Every trait call is counted per
/// primitive, and [`set_offline`](Self::set_offline) turns every call into
/// a [`StoreError::Connection`].
pub struct InMemoryRemoteStore {
    state: RwLock<State>,
    calls: Mutex<BTreeMap<&'static str, usize>>,
    offline: AtomicBool,
    report_modseq: bool,
}

impl InMemoryRemoteStore {
    /// Create an empty store whose status calls carry no modseq.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                folders: BTreeMap::new(),
                next_uidvalidity: 1,
            }),
            calls: Mutex::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
            report_modseq: false,
        }
    }

    /// Create an empty store that reports a highest modseq on status.
    pub fn with_modseq() -> Self {
        Self {
            report_modseq: true,
            ..Self::new()
        }
    }

    /// Simulate an unreachable server.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls made to the named primitive, e.g. `"status"`.
    pub fn call_count(&self, primitive: &str) -> usize {
        self.calls
            .lock()
            .expect("lock poisoned")
            .get(primitive)
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of all call counters.
    pub fn calls(&self) -> BTreeMap<&'static str, usize> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().expect("lock poisoned").clear();
    }

    /// Invalidate the id space of a folder.
    ///
    /// The folder gets a new uidvalidity and its messages are renumbered
    /// from 1, as a server does after rebuilding a mailbox.
    pub fn invalidate(&self, path: &str) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        let uidvalidity = state.allocate_uidvalidity();
        let folder = state.folder_mut(path)?;
        let messages = std::mem::take(&mut folder.messages);
        let annotations = std::mem::take(&mut folder.annotations);
        let mut fresh = Folder::new(uidvalidity);
        fresh.annotations = annotations;
        for content in messages.into_values() {
            fresh.append(content);
        }
        *folder = fresh;
        Ok(())
    }

    /// Bump the folder's modseq as a flag change on `id` would.
    pub fn touch(&self, path: &str, id: BackendId) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        let folder = state.folder_mut(path)?;
        if !folder.messages.contains_key(&id) {
            return Err(StoreError::MessageNotFound {
                path: path.to_string(),
                id,
            });
        }
        folder.highest_modseq += 1;
        Ok(())
    }

    /// Number of messages in a folder, without counting as a call.
    pub fn message_count(&self, path: &str) -> usize {
        let state = self.state.read().expect("lock poisoned");
        state.folders.get(path).map_or(0, |f| f.messages.len())
    }

    fn enter(&self, primitive: &'static str) -> StoreResult<()> {
        *self
            .calls
            .lock()
            .expect("lock poisoned")
            .entry(primitive)
            .or_insert(0) += 1;
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(format!(
                "{primitive}: remote store unreachable"
            )));
        }
        Ok(())
    }

    fn message(&self, path: &str, id: BackendId) -> StoreResult<Vec<u8>> {
        let state = self.state.read().expect("lock poisoned");
        state
            .folder(path)?
            .messages
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::MessageNotFound {
                path: path.to_string(),
                id,
            })
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn list(&self) -> StoreResult<Vec<String>> {
        self.enter("list")?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state.folders.keys().cloned().collect())
    }

    fn create(&self, path: &str) -> StoreResult<()> {
        self.enter("create")?;
        let mut state = self.state.write().expect("lock poisoned");
        if state.folders.contains_key(path) {
            return Err(StoreError::FolderExists(path.to_string()));
        }
        let uidvalidity = state.allocate_uidvalidity();
        state.folders.insert(path.to_string(), Folder::new(uidvalidity));
        tracing::debug!(path, uidvalidity, "folder created");
        Ok(())
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        self.enter("delete")?;
        let mut state = self.state.write().expect("lock poisoned");
        state
            .folders
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::FolderNotFound(path.to_string()))
    }

    fn rename(&self, old: &str, new: &str) -> StoreResult<()> {
        self.enter("rename")?;
        let mut state = self.state.write().expect("lock poisoned");
        if state.folders.contains_key(new) {
            return Err(StoreError::FolderExists(new.to_string()));
        }
        let folder = state
            .folders
            .remove(old)
            .ok_or_else(|| StoreError::FolderNotFound(old.to_string()))?;
        state.folders.insert(new.to_string(), folder);
        Ok(())
    }

    fn set_annotation(&self, path: &str, key: &str, value: &str) -> StoreResult<()> {
        self.enter("set_annotation")?;
        let mut state = self.state.write().expect("lock poisoned");
        state
            .folder_mut(path)?
            .annotations
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_annotation(&self, path: &str, key: &str) -> StoreResult<Option<String>> {
        self.enter("get_annotation")?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state.folder(path)?.annotations.get(key).cloned())
    }

    fn list_annotation(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        self.enter("list_annotation")?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state
            .folders
            .iter()
            .filter_map(|(path, folder)| {
                folder
                    .annotations
                    .get(key)
                    .map(|value| (path.clone(), value.clone()))
            })
            .collect())
    }

    fn status(&self, path: &str) -> StoreResult<FolderStatus> {
        self.enter("status")?;
        let state = self.state.read().expect("lock poisoned");
        let folder = state.folder(path)?;
        Ok(FolderStatus {
            uidvalidity: folder.uidvalidity,
            uidnext: folder.uidnext,
            highest_modseq: self.report_modseq.then_some(folder.highest_modseq),
        })
    }

    fn search(&self, path: &str) -> StoreResult<Vec<BackendId>> {
        self.enter("search")?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state.folder(path)?.messages.keys().copied().collect())
    }

    fn fetch_structure(
        &self,
        path: &str,
        ids: &[BackendId],
    ) -> StoreResult<BTreeMap<BackendId, MessageStructure>> {
        self.enter("fetch_structure")?;
        let state = self.state.read().expect("lock poisoned");
        let folder = state.folder(path)?;
        let mut out = BTreeMap::new();
        for id in ids {
            if let Some(raw) = folder.messages.get(id) {
                let structure = MessageStructure::parse(raw).unwrap_or_else(|error| {
                    tracing::warn!(path, id = %id, %error, "unparseable message structure");
                    MessageStructure::opaque()
                });
                out.insert(*id, structure);
            }
        }
        Ok(out)
    }

    fn fetch_content(&self, path: &str, id: BackendId) -> StoreResult<Vec<u8>> {
        self.enter("fetch_content")?;
        self.message(path, id)
    }

    fn fetch_part(&self, path: &str, id: BackendId, part_id: &str) -> StoreResult<Vec<u8>> {
        self.enter("fetch_part")?;
        let raw = self.message(path, id)?;
        extract_part(&raw, part_id)?.ok_or_else(|| StoreError::PartNotFound {
            path: path.to_string(),
            id,
            part_id: part_id.to_string(),
        })
    }

    fn append(&self, path: &str, content: &[u8]) -> StoreResult<Option<BackendId>> {
        self.enter("append")?;
        let mut state = self.state.write().expect("lock poisoned");
        let id = state.folder_mut(path)?.append(content.to_vec());
        Ok(Some(id))
    }

    fn delete_messages(&self, path: &str, ids: &[BackendId]) -> StoreResult<()> {
        self.enter("delete_messages")?;
        let mut state = self.state.write().expect("lock poisoned");
        let folder = state.folder_mut(path)?;
        let mut removed = false;
        for id in ids {
            removed |= folder.messages.remove(id).is_some();
        }
        if removed {
            folder.highest_modseq += 1;
        }
        Ok(())
    }

    fn move_message(&self, path: &str, id: BackendId, target: &str) -> StoreResult<()> {
        self.enter("move_message")?;
        let mut state = self.state.write().expect("lock poisoned");
        // Validate the target before detaching the message.
        state.folder(target)?;
        let source = state.folder_mut(path)?;
        let content = source
            .messages
            .remove(&id)
            .ok_or_else(|| StoreError::MessageNotFound {
                path: path.to_string(),
                id,
            })?;
        source.highest_modseq += 1;
        state.folder_mut(target)?.append(content);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.state.read().expect("lock poisoned").folders.len();
        f.debug_struct("InMemoryRemoteStore")
            .field("folder_count", &count)
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .finish()
    }
}
