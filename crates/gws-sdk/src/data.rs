//! Cached object access for one folder.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use gws_format::{
    Envelope, FormatError, ObjectData, ObjectLoader, ObjectRecord, ParseFailure, Payload,
};
use gws_history::HistoryCorrelator;
use gws_stamp::{ChangeStamp, StampChanges};
use gws_store::structure::extract_part;
use gws_store::RemoteStore;
use gws_types::{BackendId, ObjectType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SdkError, SdkResult};
use crate::query::{HistoryQuery, QueryKind};

/// How a synchronization pass related to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    /// First pass; everything was loaded.
    Initial,
    /// The folder stamp did not change.
    Unchanged,
    /// Only the changed ids were loaded or evicted.
    Updated,
    /// The folder's id space was invalidated and everything was reloaded.
    Reset,
}

/// Outcome of [`DataQuery::synchronize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub kind: SyncKind,
    pub added: Vec<BackendId>,
    pub deleted: Vec<BackendId>,
    /// Newly loaded ids whose payload could not be parsed.
    pub fallbacks: Vec<BackendId>,
}

impl SyncReport {
    fn unchanged() -> Self {
        Self {
            kind: SyncKind::Unchanged,
            added: Vec::new(),
            deleted: Vec::new(),
            fallbacks: Vec::new(),
        }
    }
}

/// Persisted form of a query cache.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    query_id: String,
    token: Option<Vec<u8>>,
    records: Vec<ObjectRecord>,
}

/// Objects of one folder, cached by backend id and kept current by
/// [`synchronize`](Self::synchronize).
///
/// A query never polls on its own. Read methods answer from the cache and
/// fail with [`SdkError::NotSynchronized`] until the first pass ran.
pub struct DataQuery {
    id: String,
    path: String,
    object_type: ObjectType,
    store: Arc<dyn RemoteStore>,
    loader: ObjectLoader,
    envelope: Envelope,
    history: Option<HistoryCorrelator>,
    stamp: Option<ChangeStamp>,
    records: BTreeMap<BackendId, ObjectRecord>,
}

impl DataQuery {
    pub(crate) fn new(
        id: String,
        path: String,
        store: Arc<dyn RemoteStore>,
        loader: ObjectLoader,
        envelope: Envelope,
        history: Option<HistoryCorrelator>,
    ) -> Self {
        Self {
            id,
            path,
            object_type: loader.folder_type().clone(),
            store,
            loader,
            envelope,
            history,
            stamp: None,
            records: BTreeMap::new(),
        }
    }

    /// Stable identifier of this folder and type, used to scope the cache
    /// and the history log.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    pub fn is_synchronized(&self) -> bool {
        self.stamp.is_some()
    }

    // ---- Synchronization ----

    /// Bring the cache up to date with the remote folder.
    ///
    /// Costs one status and one search call. Objects are only loaded for
    /// ids that appeared since the last pass. History is written for uids
    /// that were added, modified, or deleted; an unchanged folder writes
    /// nothing.
    pub fn synchronize(&mut self) -> SdkResult<SyncReport> {
        let current = self.store.stamp(&self.path)?;
        let report = match self.stamp.clone() {
            None => self.reload(&current, SyncKind::Initial)?,
            Some(previous) if previous.is_reset(&current) => {
                info!(
                    path = %self.path,
                    old = previous.generation(),
                    new = current.generation(),
                    "folder id space was reset; reloading"
                );
                self.reload(&current, SyncKind::Reset)?
            }
            Some(previous) => match previous.get_changes(&current)? {
                Some(changes) if !changes.is_empty() => self.apply(changes)?,
                _ => SyncReport::unchanged(),
            },
        };
        self.fill_gaps(&current)?;
        self.stamp = Some(current);

        debug!(
            path = %self.path,
            kind = ?report.kind,
            added = report.added.len(),
            deleted = report.deleted.len(),
            fallbacks = report.fallbacks.len(),
            "folder synchronized"
        );
        Ok(report)
    }

    fn reload(&mut self, current: &ChangeStamp, kind: SyncKind) -> SdkResult<SyncReport> {
        let loaded = self.loader.load_batch(self.store.as_ref(), &self.path, current.ids())?;
        let old_uids = uid_set(self.records.values());
        let new_uids = uid_set(loaded.values());

        if let Some(history) = &self.history {
            match kind {
                SyncKind::Initial => {
                    history.record_initial(&new_uids.iter().collect::<Vec<_>>()[..])?;
                }
                _ => {
                    let added: Vec<&String> = new_uids.difference(&old_uids).collect();
                    let deleted: Vec<&String> = old_uids.difference(&new_uids).collect();
                    history.record_added(&added[..])?;
                    history.record_deleted(&deleted[..])?;
                }
            }
        }

        let deleted = self.records.keys().copied().collect();
        let report = SyncReport {
            kind,
            added: loaded.keys().copied().collect(),
            deleted,
            fallbacks: fallback_ids(&loaded),
        };
        self.records = loaded;
        Ok(report)
    }

    fn apply(&mut self, changes: StampChanges) -> SdkResult<SyncReport> {
        let loaded = self.loader.load_batch(self.store.as_ref(), &self.path, &changes.added)?;

        let removed: Vec<ObjectRecord> = changes
            .deleted
            .iter()
            .filter_map(|id| self.records.remove(id))
            .collect();
        let removed_uids = uid_set(removed.iter());
        let added_uids = uid_set(loaded.values());
        let remaining = uid_set(self.records.values());

        if let Some(history) = &self.history {
            // Writing an object appends a new document and removes the old
            // one, so a uid seen on both sides was modified.
            let mut added = Vec::new();
            for uid in &added_uids {
                if removed_uids.contains(uid) || remaining.contains(uid) {
                    history.record_modified(uid)?;
                } else {
                    added.push(uid);
                }
            }
            let deleted: Vec<&String> = removed_uids
                .iter()
                .filter(|uid| !added_uids.contains(*uid) && !remaining.contains(*uid))
                .collect();
            history.record_added(&added[..])?;
            history.record_deleted(&deleted[..])?;
        }

        let report = SyncReport {
            kind: SyncKind::Updated,
            added: loaded.keys().copied().collect(),
            deleted: changes.deleted,
            fallbacks: fallback_ids(&loaded),
        };
        self.records.extend(loaded);
        Ok(report)
    }

    /// Load ids the stamp lists but the cache lacks, and evict records the
    /// stamp no longer lists. Only does work after a token restore.
    fn fill_gaps(&mut self, current: &ChangeStamp) -> SdkResult<()> {
        let listed: BTreeSet<BackendId> = current.ids().iter().copied().collect();
        self.records.retain(|id, _| listed.contains(id));
        let missing: Vec<BackendId> = listed
            .iter()
            .filter(|id| !self.records.contains_key(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            debug!(path = %self.path, count = missing.len(), "loading objects missing from cache");
            let loaded = self.loader.load_batch(self.store.as_ref(), &self.path, &missing)?;
            self.records.extend(loaded);
        }
        Ok(())
    }

    // ---- Reads ----

    /// Records for `ids`, served from the cache where possible.
    pub fn fetch(&mut self, ids: &[BackendId]) -> SdkResult<BTreeMap<BackendId, ObjectRecord>> {
        let missing: Vec<BackendId> = ids
            .iter()
            .filter(|id| !self.records.contains_key(id))
            .copied()
            .collect();
        let loaded = self.loader.load_batch(self.store.as_ref(), &self.path, &missing)?;
        self.records.extend(loaded);
        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| (*id, r.clone())))
            .collect())
    }

    /// A specialized view of this folder's data.
    pub fn get_query(&self, kind: QueryKind) -> SdkResult<HistoryQuery> {
        match kind {
            QueryKind::History => self
                .history
                .clone()
                .map(HistoryQuery::new)
                .ok_or_else(|| SdkError::InvalidOperation("history is disabled".into())),
        }
    }

    /// Every cached record, including fallbacks, by backend id.
    pub fn records(&self) -> SdkResult<&BTreeMap<BackendId, ObjectRecord>> {
        self.ensure_synchronized()?;
        Ok(&self.records)
    }

    /// Parsed objects by uid. For duplicated uids the newest copy wins.
    pub fn objects(&self) -> SdkResult<BTreeMap<String, ObjectRecord>> {
        self.ensure_synchronized()?;
        let mut out = BTreeMap::new();
        for record in self.records.values() {
            if let Some(uid) = &record.uid {
                out.insert(uid.clone(), record.clone());
            }
        }
        Ok(out)
    }

    pub fn object_ids(&self) -> SdkResult<Vec<String>> {
        Ok(self.objects()?.into_keys().collect())
    }

    pub fn object_exists(&self, uid: &str) -> SdkResult<bool> {
        self.ensure_synchronized()?;
        Ok(!self.ids_of(uid).is_empty())
    }

    /// The one object with `uid`.
    pub fn object(&self, uid: &str) -> SdkResult<ObjectRecord> {
        let id = self.backend_id(uid)?;
        self.records
            .get(&id)
            .cloned()
            .ok_or_else(|| SdkError::NotFound(uid.to_string()))
    }

    /// The backend id of the one object with `uid`.
    pub fn backend_id(&self, uid: &str) -> SdkResult<BackendId> {
        self.ensure_synchronized()?;
        let ids = self.ids_of(uid);
        match ids.as_slice() {
            [] => Err(SdkError::NotFound(uid.to_string())),
            [id] => Ok(*id),
            _ => Err(SdkError::Ambiguous {
                uid: uid.to_string(),
                ids,
            }),
        }
    }

    /// Uids stored more than once, with all their backend ids.
    pub fn duplicates(&self) -> SdkResult<BTreeMap<String, Vec<BackendId>>> {
        self.ensure_synchronized()?;
        let mut by_uid: BTreeMap<String, Vec<BackendId>> = BTreeMap::new();
        for record in self.records.values() {
            if let Some(uid) = &record.uid {
                by_uid.entry(uid.clone()).or_default().push(record.backend_id);
            }
        }
        by_uid.retain(|_, ids| ids.len() > 1);
        Ok(by_uid)
    }

    /// Objects whose payload could not be parsed.
    pub fn errors(&self) -> SdkResult<BTreeMap<BackendId, ParseFailure>> {
        self.ensure_synchronized()?;
        Ok(self
            .records
            .iter()
            .filter_map(|(id, r)| r.payload.failure().map(|f| (*id, f.clone())))
            .collect())
    }

    // ---- Writes ----

    /// Store a new object and return its uid. A uid is generated when
    /// `data` has none.
    pub fn create(&mut self, mut data: ObjectData) -> SdkResult<String> {
        self.ensure_writable()?;
        let uid = match data.get("uid").and_then(|v| v.as_str()) {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => {
                let uid = uuid::Uuid::new_v4().to_string();
                data.insert("uid".into(), serde_json::Value::String(uid.clone()));
                uid
            }
        };
        if self.object_exists(&uid)? {
            return Err(SdkError::ObjectExists(uid));
        }

        let payload = self.loader.codec().save(&Payload::Parsed(data), None)?;
        let document = self.envelope.build(&uid, &self.object_type, &payload)?;
        self.store.append(&self.path, &document)?;
        info!(path = %self.path, uid = %uid, "object created");

        self.synchronize()?;
        Ok(uid)
    }

    /// Replace the object with the uid in `data`.
    ///
    /// Fields the format engine does not know survive, as do extra parts of
    /// the stored document.
    pub fn modify(&mut self, data: ObjectData) -> SdkResult<()> {
        self.ensure_writable()?;
        let uid = data
            .get("uid")
            .and_then(|v| v.as_str())
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .ok_or(FormatError::MissingUid)?;
        let old_id = self.backend_id(&uid)?;
        let previous = self.records.get(&old_id);
        let part_id = previous.and_then(|r| r.mime_part_id.clone());
        let object_type = previous
            .map(|r| r.object_type.clone())
            .unwrap_or_else(|| self.object_type.clone());

        let previous_document = self.store.fetch_content(&self.path, old_id)?;
        let previous_payload = match &part_id {
            Some(part_id) => extract_part(&previous_document, part_id)?,
            None => None,
        };

        // Documents of another type keep their type.
        let codec = self
            .loader
            .codec_for(&object_type)
            .unwrap_or_else(|| self.loader.codec());
        let payload = codec.save(&Payload::Parsed(data), previous_payload.as_deref())?;
        let document = self
            .envelope
            .rebuild(&previous_document, &uid, &object_type, &payload)?;
        self.store.append(&self.path, &document)?;
        self.store.delete_messages(&self.path, &[old_id])?;
        info!(path = %self.path, uid = %uid, "object modified");

        self.synchronize()?;
        Ok(())
    }

    /// Delete every copy of each uid.
    pub fn delete<S: AsRef<str>>(&mut self, uids: &[S]) -> SdkResult<()> {
        self.ensure_synchronized()?;
        let mut ids = Vec::new();
        for uid in uids {
            let found = self.ids_of(uid.as_ref());
            if found.is_empty() {
                return Err(SdkError::NotFound(uid.as_ref().to_string()));
            }
            ids.extend(found);
        }
        self.delete_backend_ids(&ids)
    }

    /// Delete objects by backend id, including ones that failed to parse.
    pub fn delete_backend_ids(&mut self, ids: &[BackendId]) -> SdkResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.delete_messages(&self.path, ids)?;
        info!(path = %self.path, count = ids.len(), "objects deleted");
        self.synchronize()?;
        Ok(())
    }

    /// Delete every object in the folder.
    pub fn delete_all(&mut self) -> SdkResult<()> {
        self.ensure_synchronized()?;
        let ids: Vec<BackendId> = self.records.keys().copied().collect();
        self.delete_backend_ids(&ids)
    }

    /// Move the object with `uid` to the folder at `target`.
    pub fn move_object(&mut self, uid: &str, target: &str) -> SdkResult<()> {
        let id = self.backend_id(uid)?;
        self.store.move_message(&self.path, id, target)?;
        info!(path = %self.path, uid, target, "object moved");
        self.synchronize()?;
        Ok(())
    }

    // ---- Persistence ----

    /// Opaque token describing the folder state the cache reflects.
    pub fn cache_token(&self) -> SdkResult<Option<Vec<u8>>> {
        match &self.stamp {
            Some(stamp) => Ok(Some(gws_stamp::encode(stamp)?)),
            None => Ok(None),
        }
    }

    /// Adopt a token saved by [`cache_token`](Self::cache_token).
    ///
    /// The next pass diffs against the token, so only changes made since it
    /// was taken are reported and logged. Objects present at that time are
    /// loaded without history entries.
    pub fn restore_cache_token(&mut self, token: &[u8]) -> SdkResult<()> {
        self.stamp = Some(gws_stamp::decode(token)?);
        Ok(())
    }

    /// Serialize the cache, stamp and records, for a later session.
    pub fn export_snapshot(&self) -> SdkResult<Vec<u8>> {
        let snapshot = Snapshot {
            query_id: self.id.clone(),
            token: self.cache_token()?,
            records: self.records.values().cloned().collect(),
        };
        serde_json::to_vec(&snapshot).map_err(|e| SdkError::Snapshot(e.to_string()))
    }

    /// Replace the cache with a snapshot taken from a query on the same
    /// folder and type.
    pub fn import_snapshot(&mut self, bytes: &[u8]) -> SdkResult<()> {
        let snapshot: Snapshot =
            serde_json::from_slice(bytes).map_err(|e| SdkError::Snapshot(e.to_string()))?;
        if snapshot.query_id != self.id {
            return Err(SdkError::Snapshot(format!(
                "snapshot belongs to query {}, not {}",
                snapshot.query_id, self.id
            )));
        }
        self.stamp = snapshot.token.as_deref().map(gws_stamp::decode).transpose()?;
        self.records = snapshot
            .records
            .into_iter()
            .map(|r| (r.backend_id, r))
            .collect();
        Ok(())
    }

    // ---- Helpers ----

    fn ids_of(&self, uid: &str) -> Vec<BackendId> {
        self.records
            .values()
            .filter(|r| r.uid.as_deref() == Some(uid))
            .map(|r| r.backend_id)
            .collect()
    }

    fn ensure_synchronized(&self) -> SdkResult<()> {
        if self.stamp.is_none() {
            return Err(SdkError::NotSynchronized(self.path.clone()));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> SdkResult<()> {
        if self.loader.codec().is_raw() {
            return Err(SdkError::InvalidOperation(format!(
                "{} folders hold raw messages and cannot store objects",
                self.object_type
            )));
        }
        self.ensure_synchronized()
    }
}

impl std::fmt::Debug for DataQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataQuery")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("object_type", &self.object_type)
            .field("records", &self.records.len())
            .field("synchronized", &self.stamp.is_some())
            .finish()
    }
}

fn uid_set<'a>(records: impl Iterator<Item = &'a ObjectRecord>) -> BTreeSet<String> {
    records.filter_map(|r| r.uid.clone()).collect()
}

fn fallback_ids(records: &BTreeMap<BackendId, ObjectRecord>) -> Vec<BackendId> {
    records
        .values()
        .filter(|r| r.is_fallback())
        .map(|r| r.backend_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use gws_format::FailureKind;
    use gws_history::InMemoryHistory;
    use gws_stamp::StampError;
    use gws_store::{InMemoryRemoteStore, StoreError};
    use gws_types::{HistoryAction, ANNOTATION_FOLDER_TYPE};
    use serde_json::json;

    use super::*;
    use crate::config::StorageConfig;
    use crate::context::StorageContext;
    use crate::storage::Storage;

    const USER: &str = "john@example.org";
    const NOTES: &str = "INBOX/Notes";

    struct Fixture {
        store: Arc<InMemoryRemoteStore>,
        history: Arc<InMemoryHistory>,
        storage: Storage,
    }

    impl Fixture {
        fn notes(&self) -> DataQuery {
            self.storage.get_folder(NOTES).unwrap().get_data().unwrap()
        }

        fn append(&self, uid: &str, summary: &str) -> BackendId {
            self.append_raw(&document(uid, summary))
        }

        fn append_raw(&self, content: &[u8]) -> BackendId {
            self.store.append(NOTES, content).unwrap().unwrap()
        }
    }

    fn fixture_with(store: InMemoryRemoteStore, config: StorageConfig) -> Fixture {
        let store = Arc::new(store);
        store.create("INBOX").unwrap();
        store.create(NOTES).unwrap();
        store.set_annotation(NOTES, ANNOTATION_FOLDER_TYPE, "note").unwrap();
        let history = Arc::new(InMemoryHistory::new());
        let context = StorageContext::new(config, store.clone())
            .unwrap()
            .with_history(history.clone());
        Fixture {
            store,
            history,
            storage: Storage::new(context),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(InMemoryRemoteStore::new(), StorageConfig::for_user(USER))
    }

    fn document(uid: &str, summary: &str) -> Vec<u8> {
        let xml = format!(
            "<note version=\"1.0\"><uid>{uid}</uid><summary>{summary}</summary></note>"
        );
        Envelope::new(USER, "gws-test/1")
            .build(uid, &ObjectType::Note, xml.as_bytes())
            .unwrap()
    }

    fn note(uid: Option<&str>, summary: &str) -> ObjectData {
        let mut data = ObjectData::new();
        if let Some(uid) = uid {
            data.insert("uid".into(), json!(uid));
        }
        data.insert("summary".into(), json!(summary));
        data
    }

    fn summary_of(query: &DataQuery, uid: &str) -> String {
        let record = query.object(uid).unwrap();
        record.payload.data().unwrap()["summary"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn latest_action(query: &DataQuery, uid: &str) -> Option<HistoryAction> {
        query
            .get_query(QueryKind::History)
            .unwrap()
            .latest_action(uid)
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Synchronization
    // -----------------------------------------------------------------------

    #[test]
    fn initial_pass_loads_everything() {
        let f = fixture();
        let a = f.append("a", "first");
        let b = f.append("b", "second");

        let mut q = f.notes();
        let report = q.synchronize().unwrap();
        assert_eq!(report.kind, SyncKind::Initial);
        assert_eq!(report.added, vec![a, b]);
        assert_eq!(q.object_ids().unwrap(), vec!["a", "b"]);
        assert_eq!(summary_of(&q, "b"), "second");
        assert_eq!(latest_action(&q, "a"), Some(HistoryAction::Add));
        assert_eq!(f.history.len(), 2);
    }

    #[test]
    fn unchanged_poll_is_a_no_op() {
        let f = fixture();
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();
        let entries = f.history.len();
        f.store.reset_calls();

        let report = q.synchronize().unwrap();
        assert_eq!(report.kind, SyncKind::Unchanged);
        assert_eq!(f.store.call_count("status"), 1);
        assert_eq!(f.store.call_count("search"), 1);
        assert_eq!(f.store.call_count("fetch_structure"), 0);
        assert_eq!(f.store.call_count("fetch_part"), 0);
        assert_eq!(f.history.len(), entries);
    }

    #[test]
    fn only_new_ids_are_fetched() {
        let f = fixture();
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();

        let c = f.append("c", "third");
        f.store.reset_calls();
        let report = q.synchronize().unwrap();
        assert_eq!(report.kind, SyncKind::Updated);
        assert_eq!(report.added, vec![c]);
        assert!(report.deleted.is_empty());
        assert_eq!(f.store.call_count("fetch_structure"), 1);
        assert_eq!(f.store.call_count("fetch_part"), 1);
        assert_eq!(latest_action(&q, "c"), Some(HistoryAction::Add));
    }

    #[test]
    fn remote_delete_is_evicted_and_logged() {
        let f = fixture();
        let a = f.append("a", "first");
        f.append("b", "second");
        let mut q = f.notes();
        q.synchronize().unwrap();

        f.store.delete_messages(NOTES, &[a]).unwrap();
        let report = q.synchronize().unwrap();
        assert_eq!(report.deleted, vec![a]);
        assert!(!q.object_exists("a").unwrap());
        assert_eq!(latest_action(&q, "a"), Some(HistoryAction::Delete));
        assert_eq!(latest_action(&q, "b"), Some(HistoryAction::Add));
    }

    #[test]
    fn invalidated_folder_is_reloaded() {
        let f = fixture();
        f.append("a", "first");
        f.append("b", "second");
        let mut q = f.notes();
        q.synchronize().unwrap();
        let entries = f.history.len();

        f.store.invalidate(NOTES).unwrap();
        let report = q.synchronize().unwrap();
        assert_eq!(report.kind, SyncKind::Reset);
        assert_eq!(report.added.len(), 2);
        assert_eq!(q.object_ids().unwrap(), vec!["a", "b"]);
        // Same uids before and after: nothing to record.
        assert_eq!(f.history.len(), entries);
    }

    #[test]
    fn initial_pass_skips_uids_already_in_history() {
        let f = fixture();
        f.append("a", "first");
        f.notes().synchronize().unwrap();
        assert_eq!(f.history.len(), 1);

        f.notes().synchronize().unwrap();
        assert_eq!(f.history.len(), 1);
    }

    #[test]
    fn initial_pass_re_adds_object_recreated_elsewhere() {
        let f = fixture();
        let mut q = f.notes();
        q.synchronize().unwrap();
        q.create(note(Some("a"), "first")).unwrap();
        q.delete(&["a"]).unwrap();
        assert_eq!(latest_action(&q, "a"), Some(HistoryAction::Delete));

        // Another client stores the uid again while this session is gone.
        f.append("a", "again");
        let mut fresh = f.notes();
        fresh.synchronize().unwrap();
        assert!(fresh.object_exists("a").unwrap());
        assert_eq!(latest_action(&fresh, "a"), Some(HistoryAction::Add));
    }

    #[test]
    fn initial_pass_deletes_objects_removed_elsewhere() {
        let f = fixture();
        f.append("a", "first");
        let b = f.append("b", "second");
        f.notes().synchronize().unwrap();

        f.store.delete_messages(NOTES, &[b]).unwrap();
        let mut fresh = f.notes();
        fresh.synchronize().unwrap();
        assert_eq!(latest_action(&fresh, "a"), Some(HistoryAction::Add));
        assert_eq!(latest_action(&fresh, "b"), Some(HistoryAction::Delete));
        assert_eq!(f.history.len(), 3);
    }

    #[test]
    fn connection_errors_surface_and_keep_cache() {
        let f = fixture();
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();

        f.store.set_offline(true);
        assert!(matches!(
            q.synchronize(),
            Err(SdkError::Store(StoreError::Connection(_)))
        ));
        assert!(q.object_exists("a").unwrap());
    }

    #[test]
    fn stamp_kind_mismatch_is_an_error() {
        let f = fixture_with(InMemoryRemoteStore::with_modseq(), StorageConfig::for_user(USER));
        let status = f.store.status(NOTES).unwrap();
        let stale = ChangeStamp::uids(status.uidvalidity, status.uidnext, Vec::new());
        let token = gws_stamp::encode(&stale).unwrap();

        let mut q = f.notes();
        q.restore_cache_token(&token).unwrap();
        assert!(matches!(
            q.synchronize(),
            Err(SdkError::Stamp(StampError::KindMismatch { .. }))
        ));
    }

    // -----------------------------------------------------------------------
    // Lenient parsing
    // -----------------------------------------------------------------------

    #[test]
    fn undecodable_payload_does_not_abort_synchronize() {
        let f = fixture();
        let a = f.append("a", "first");
        let broken = "From: john@example.org\r\n\
Subject: b\r\n\
X-Kolab-Type: application/x-vnd.kolab.note\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
summary\r\n\
--b1\r\n\
Content-Type: application/x-vnd.kolab.note; name=\"kolab.xml\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
!!!!not*base64@@@\r\n\
--b1--\r\n";
        let b = f.append_raw(broken.as_bytes());

        let mut q = f.notes();
        let report = q.synchronize().unwrap();
        assert_eq!(report.added, vec![a, b]);
        assert_eq!(report.fallbacks, vec![b]);
        assert_eq!(q.object_ids().unwrap(), vec!["a"]);
        assert_eq!(q.errors().unwrap()[&b].kind, FailureKind::InvalidKolabPart);

        // The stamp advanced, so the next poll is a no-op.
        assert_eq!(q.synchronize().unwrap().kind, SyncKind::Unchanged);
    }

    #[test]
    fn document_of_other_type_is_parsed_by_header() {
        let f = fixture();
        let task = Envelope::new(USER, "gws-test/1")
            .build("t1", &ObjectType::Task, b"<task version=\"1.0\"><uid>t1</uid></task>")
            .unwrap();
        let id = f.append_raw(&task);

        let mut q = f.notes();
        let report = q.synchronize().unwrap();
        assert!(report.fallbacks.is_empty());
        let record = q.object("t1").unwrap();
        assert_eq!(record.backend_id, id);
        assert_eq!(record.object_type, ObjectType::Task);

        q.modify(note(Some("t1"), "renamed")).unwrap();
        let record = q.object("t1").unwrap();
        assert_eq!(record.object_type, ObjectType::Task);
        assert_eq!(summary_of(&q, "t1"), "renamed");
    }

    #[test]
    fn malformed_objects_are_kept_as_fallbacks() {
        let f = fixture();
        f.append("a", "first");
        let broken = Envelope::new(USER, "gws-test/1")
            .build("b", &ObjectType::Note, b"<note><uid>b</uid>")
            .unwrap();
        let b = f.append_raw(&broken);

        let mut q = f.notes();
        let report = q.synchronize().unwrap();
        assert_eq!(report.fallbacks, vec![b]);
        assert_eq!(q.object_ids().unwrap(), vec!["a"]);

        let errors = q.errors().unwrap();
        assert_eq!(errors[&b].kind, FailureKind::Malformed);
        assert!(q.records().unwrap()[&b].is_fallback());
        // Fallbacks have no uid and write no history.
        assert_eq!(f.history.len(), 1);

        let fetched = q.fetch(&[b]).unwrap();
        assert!(fetched[&b].is_fallback());
    }

    #[test]
    fn fetch_serves_cached_records() {
        let f = fixture();
        let a = f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();
        f.store.reset_calls();

        let fetched = q.fetch(&[a, BackendId(77)]).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(f.store.call_count("fetch_part"), 0);
    }

    // -----------------------------------------------------------------------
    // Single-result lookups
    // -----------------------------------------------------------------------

    #[test]
    fn reads_require_a_pass() {
        let f = fixture();
        let q = f.notes();
        assert!(matches!(q.objects(), Err(SdkError::NotSynchronized(_))));
        assert!(matches!(q.backend_id("a"), Err(SdkError::NotSynchronized(_))));
    }

    #[test]
    fn lookups_distinguish_missing_and_ambiguous() {
        let f = fixture();
        let first = f.append("dup", "one");
        let second = f.append("dup", "two");
        let mut q = f.notes();
        q.synchronize().unwrap();

        assert!(matches!(q.object("nope"), Err(SdkError::NotFound(ref u)) if u == "nope"));
        match q.backend_id("dup") {
            Err(SdkError::Ambiguous { uid, ids }) => {
                assert_eq!(uid, "dup");
                assert_eq!(ids, vec![first, second]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert_eq!(q.duplicates().unwrap()["dup"], vec![first, second]);
        // The newest copy wins in the uid map.
        assert_eq!(q.objects().unwrap()["dup"].backend_id, second);
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    #[test]
    fn create_generates_uid_and_logs_add() {
        let f = fixture();
        let mut q = f.notes();
        q.synchronize().unwrap();

        let uid = q.create(note(None, "hello")).unwrap();
        assert!(!uid.is_empty());
        assert_eq!(summary_of(&q, &uid), "hello");
        assert_eq!(latest_action(&q, &uid), Some(HistoryAction::Add));
        assert_eq!(f.store.message_count(NOTES), 1);

        let stored = f.store.fetch_content(NOTES, q.backend_id(&uid).unwrap()).unwrap();
        let structure = gws_store::MessageStructure::parse(&stored).unwrap();
        assert_eq!(structure.subject.as_deref(), Some(uid.as_str()));
    }

    #[test]
    fn create_rejects_existing_uid() {
        let f = fixture();
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();
        assert!(matches!(
            q.create(note(Some("a"), "again")),
            Err(SdkError::ObjectExists(ref u)) if u == "a"
        ));
    }

    #[test]
    fn modify_replaces_document_and_logs_modify() {
        let f = fixture();
        let mut q = f.notes();
        q.synchronize().unwrap();
        let mut data = note(Some("m1"), "before");
        data.insert("x-custom".into(), json!("kept"));
        q.create(data).unwrap();
        let old_id = q.backend_id("m1").unwrap();

        q.modify(note(Some("m1"), "after")).unwrap();
        assert_eq!(summary_of(&q, "m1"), "after");
        assert_ne!(q.backend_id("m1").unwrap(), old_id);
        assert_eq!(f.store.message_count(NOTES), 1);
        assert_eq!(latest_action(&q, "m1"), Some(HistoryAction::Modify));

        let record = q.object("m1").unwrap();
        assert_eq!(record.payload.data().unwrap()["x-custom"], json!("kept"));
    }

    #[test]
    fn modify_requires_uid() {
        let f = fixture();
        let mut q = f.notes();
        q.synchronize().unwrap();
        assert!(matches!(
            q.modify(note(None, "x")),
            Err(SdkError::Format(FormatError::MissingUid))
        ));
        assert!(matches!(
            q.modify(note(Some("ghost"), "x")),
            Err(SdkError::NotFound(_))
        ));
    }

    #[test]
    fn delete_by_uid() {
        let f = fixture();
        f.append("a", "first");
        f.append("b", "second");
        let mut q = f.notes();
        q.synchronize().unwrap();

        q.delete(&["a"]).unwrap();
        assert_eq!(q.object_ids().unwrap(), vec!["b"]);
        assert_eq!(latest_action(&q, "a"), Some(HistoryAction::Delete));
        assert!(matches!(q.delete(&["a"]), Err(SdkError::NotFound(_))));

        q.delete_all().unwrap();
        assert!(q.records().unwrap().is_empty());
        assert_eq!(f.store.message_count(NOTES), 0);
    }

    #[test]
    fn move_object_to_other_folder() {
        let f = fixture();
        f.store.create("INBOX/Archive").unwrap();
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();

        q.move_object("a", "INBOX/Archive").unwrap();
        assert!(!q.object_exists("a").unwrap());
        assert_eq!(f.store.message_count("INBOX/Archive"), 1);
    }

    #[test]
    fn mail_folders_are_read_only_raw() {
        let f = fixture();
        f.store.append("INBOX", b"Subject: hi\r\n\r\nbody\r\n").unwrap();
        let mut q = f.storage.get_folder("INBOX").unwrap().get_data().unwrap();
        assert_eq!(q.object_type(), &ObjectType::Mail);

        q.synchronize().unwrap();
        let objects = q.objects().unwrap();
        assert!(matches!(objects["hi"].payload, Payload::Raw(_)));
        assert!(matches!(
            q.create(note(None, "x")),
            Err(SdkError::InvalidOperation(_))
        ));
    }

    // -----------------------------------------------------------------------
    // History view
    // -----------------------------------------------------------------------

    #[test]
    fn history_view_reports_changes_since() {
        let f = fixture();
        let start = chrono::Utc::now() - chrono::Duration::seconds(1);
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();

        let view = q.get_query(QueryKind::History).unwrap();
        assert!(view.added_since(start).unwrap().contains_key("a"));
        assert!(view.deleted_since(start).unwrap().is_empty());
    }

    #[test]
    fn history_can_be_disabled() {
        let mut config = StorageConfig::for_user(USER);
        config.history = false;
        let f = fixture_with(InMemoryRemoteStore::new(), config);
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();

        assert!(f.history.is_empty());
        assert!(matches!(
            q.get_query(QueryKind::History),
            Err(SdkError::InvalidOperation(_))
        ));
    }

    #[test]
    fn queries_are_scoped_per_folder_and_type() {
        let f = fixture();
        let folder = f.storage.get_folder(NOTES).unwrap();
        let notes = folder.get_data().unwrap();
        let as_tasks = folder.get_data_as(&ObjectType::Task).unwrap();
        assert_eq!(notes.id(), f.notes().id());
        assert_ne!(notes.id(), as_tasks.id());
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[test]
    fn restored_token_reports_only_later_changes() {
        let f = fixture();
        f.append("a", "first");
        f.append("b", "second");
        let mut q = f.notes();
        q.synchronize().unwrap();
        let token = q.cache_token().unwrap().unwrap();

        let c = f.append("c", "third");
        let mut later = f.notes();
        later.restore_cache_token(&token).unwrap();
        let report = later.synchronize().unwrap();
        assert_eq!(report.kind, SyncKind::Updated);
        assert_eq!(report.added, vec![c]);
        assert_eq!(later.object_ids().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn snapshot_round_trip_avoids_refetch() {
        let f = fixture();
        f.append("a", "first");
        let mut q = f.notes();
        q.synchronize().unwrap();
        let snapshot = q.export_snapshot().unwrap();

        let mut restored = f.notes();
        restored.import_snapshot(&snapshot).unwrap();
        assert_eq!(restored.objects().unwrap(), q.objects().unwrap());

        f.store.reset_calls();
        assert_eq!(restored.synchronize().unwrap().kind, SyncKind::Unchanged);
        assert_eq!(f.store.call_count("fetch_structure"), 0);
    }

    #[test]
    fn snapshot_of_other_folder_is_rejected() {
        let f = fixture();
        let mut q = f.notes();
        q.synchronize().unwrap();
        let snapshot = q.export_snapshot().unwrap();

        let mut mail = f.storage.get_folder("INBOX").unwrap().get_data().unwrap();
        assert!(matches!(
            mail.import_snapshot(&snapshot),
            Err(SdkError::Snapshot(_))
        ));
        assert!(matches!(
            mail.import_snapshot(b"not json"),
            Err(SdkError::Snapshot(_))
        ));
    }
}
