use gws_history::HistoryCorrelator;
use gws_list::FolderInfo;
use gws_types::{FolderType, NamespaceKind, ObjectType};

use crate::context::StorageContext;
use crate::data::DataQuery;
use crate::error::SdkResult;

/// One folder of the remote store, as classified by the namespace layout.
#[derive(Clone, Debug)]
pub struct FolderHandle {
    context: StorageContext,
    info: FolderInfo,
}

impl FolderHandle {
    pub(crate) fn new(context: StorageContext, info: FolderInfo) -> Self {
        Self { context, info }
    }

    pub fn info(&self) -> &FolderInfo {
        &self.info
    }

    pub fn path(&self) -> &str {
        &self.info.path
    }

    pub fn namespace(&self) -> NamespaceKind {
        self.info.namespace
    }

    pub fn owner(&self) -> Option<&str> {
        self.info.owner.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn subpath(&self) -> &str {
        &self.info.subpath
    }

    pub fn parent(&self) -> Option<&str> {
        self.info.parent.as_deref()
    }

    pub fn folder_type(&self) -> Option<&FolderType> {
        self.info.folder_type.as_ref()
    }

    /// Object query for the folder's own type.
    pub fn get_data(&self) -> SdkResult<DataQuery> {
        self.get_data_as(&self.info.object_type())
    }

    /// Object query reading the folder as `object_type`.
    pub fn get_data_as(&self, object_type: &ObjectType) -> SdkResult<DataQuery> {
        let id = self.query_id(object_type);
        let history = self
            .context
            .config()
            .history
            .then(|| HistoryCorrelator::new(self.context.history().clone(), id.clone()));
        Ok(DataQuery::new(
            id,
            self.info.path.clone(),
            self.context.store().clone(),
            self.context.loader(object_type)?,
            self.context.envelope(),
            history,
        ))
    }

    /// Hash of owner, namespace prefix, subpath, and object type.
    fn query_id(&self, object_type: &ObjectType) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.info.owner.as_deref().unwrap_or(""),
            self.info.prefix.as_str(),
            self.info.subpath.as_str(),
            object_type.name(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        hex::encode(&hasher.finalize().as_bytes()[..16])
    }
}
