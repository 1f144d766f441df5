use std::collections::BTreeMap;

use gws_store::{MessageStructure, RemoteStore, StoreError};
use gws_types::{BackendId, ObjectType};
use tracing::{debug, warn};

use crate::codec::ObjectCodec;
use crate::data::{FailureKind, ObjectRecord, ParseFailure, Payload};
use crate::error::FormatResult;
use crate::structure::StructureParser;

/// Structure-aware batch loader for one folder.
///
/// A batch costs one `fetch_structure` call plus one `fetch_part` per
/// located payload. Full documents are only fetched for raw folders and for
/// documents without a payload part.
#[derive(Clone, Debug)]
pub struct ObjectLoader {
    folder_type: ObjectType,
    codec: ObjectCodec,
    others: BTreeMap<ObjectType, ObjectCodec>,
}

impl ObjectLoader {
    /// Loader for a folder of `folder_type` using `codec` for its payloads.
    pub fn new(folder_type: ObjectType, codec: ObjectCodec) -> Self {
        Self {
            folder_type,
            codec,
            others: BTreeMap::new(),
        }
    }

    /// Register the codec used for documents whose `X-Kolab-Type` header
    /// names a type other than the folder's.
    pub fn with_codec(mut self, object_type: ObjectType, codec: ObjectCodec) -> Self {
        self.others.insert(object_type, codec);
        self
    }

    pub fn folder_type(&self) -> &ObjectType {
        &self.folder_type
    }

    /// Codec of the folder's own type.
    pub fn codec(&self) -> &ObjectCodec {
        &self.codec
    }

    pub fn codec_for(&self, object_type: &ObjectType) -> Option<&ObjectCodec> {
        if *object_type == self.folder_type {
            Some(&self.codec)
        } else {
            self.others.get(object_type)
        }
    }

    /// Load the objects stored under `ids` in `path`.
    ///
    /// Ids that vanished from the folder are missing from the result. Parse
    /// problems, including payload parts that cannot be decoded, never fail
    /// the batch; transport errors do.
    pub fn load_batch(
        &self,
        store: &dyn RemoteStore,
        path: &str,
        ids: &[BackendId],
    ) -> FormatResult<BTreeMap<BackendId, ObjectRecord>> {
        let mut records = BTreeMap::new();
        if ids.is_empty() {
            return Ok(records);
        }

        let structures = store.fetch_structure(path, ids)?;
        for id in ids {
            let Some(structure) = structures.get(id) else {
                debug!(path, id = %id, "object vanished before it could be loaded");
                continue;
            };
            let record = self.load_one(store, path, *id, structure)?;
            if let Some(error) = record.payload.failure() {
                warn!(path, id = %id, reason = %error, "object kept as raw fallback");
            }
            records.insert(*id, record);
        }

        debug!(path, requested = ids.len(), loaded = records.len(), "loaded object batch");
        Ok(records)
    }

    fn load_one(
        &self,
        store: &dyn RemoteStore,
        path: &str,
        id: BackendId,
        structure: &MessageStructure,
    ) -> FormatResult<ObjectRecord> {
        if self.codec.is_raw() {
            let content = store.fetch_content(path, id)?;
            return Ok(ObjectRecord {
                backend_id: id,
                uid: structure.subject.clone(),
                object_type: self.folder_type.clone(),
                payload: Payload::Raw(content),
                mime_part_id: None,
            });
        }

        let located = match StructureParser::locate(structure, &self.folder_type) {
            Ok(located) => located,
            Err(error) => return self.fallback(store, path, id, error),
        };

        let Some(codec) = self.codec_for(&located.object_type) else {
            let error = ParseFailure::new(
                FailureKind::InvalidKolabPart,
                format!("no codec for {} payloads", located.object_type),
            );
            return self.fallback(store, path, id, error);
        };

        let bytes = match store.fetch_part(path, id, &located.part_id) {
            Ok(bytes) => bytes,
            Err(error @ (StoreError::Parse(_) | StoreError::PartNotFound { .. })) => {
                let failure = ParseFailure::new(FailureKind::InvalidKolabPart, error.to_string());
                return self.fallback(store, path, id, failure);
            }
            Err(error) => return Err(error.into()),
        };
        let payload = codec.load(bytes);
        Ok(ObjectRecord {
            backend_id: id,
            uid: payload.uid().map(str::to_string),
            object_type: located.object_type,
            payload,
            mime_part_id: Some(located.part_id),
        })
    }

    fn fallback(
        &self,
        store: &dyn RemoteStore,
        path: &str,
        id: BackendId,
        error: ParseFailure,
    ) -> FormatResult<ObjectRecord> {
        let bytes = store.fetch_content(path, id)?;
        Ok(ObjectRecord {
            backend_id: id,
            uid: None,
            object_type: self.folder_type.clone(),
            payload: Payload::Fallback { bytes, error },
            mime_part_id: None,
        })
    }
}
