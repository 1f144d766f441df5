use std::sync::Arc;

use gws_list::{
    FolderInfo, FolderListCache, FolderListener, ListManipulation, ListManipulator,
    LoggedListManipulator,
};
use gws_types::{FolderType, NamespaceKind, ObjectType};

use crate::context::StorageContext;
use crate::error::{SdkError, SdkResult};
use crate::folder::FolderHandle;

/// Entry point: the folder list of one remote store.
///
/// Folder mutations go through a [`ListManipulation`] stack with the list
/// cache registered as its first listener, so folder queries never need a
/// second round trip after a create, delete, or rename.
pub struct Storage {
    context: StorageContext,
    manipulator: Box<dyn ListManipulation>,
    cache: Arc<FolderListCache>,
}

impl Storage {
    pub fn new(context: StorageContext) -> Self {
        let cache = Arc::new(FolderListCache::new(
            context.resolver().clone(),
            context.config().default_handling,
        ));
        let mut base = ListManipulator::new(context.store().clone());
        base.register_listener(cache.clone());

        let manipulator: Box<dyn ListManipulation> = if context.config().log_list_manipulation {
            Box::new(LoggedListManipulator::new(base))
        } else {
            Box::new(base)
        };

        Self {
            context,
            manipulator,
            cache,
        }
    }

    pub fn context(&self) -> &StorageContext {
        &self.context
    }

    /// The list cache; loaded on first use.
    pub fn list_cache(&self) -> SdkResult<&FolderListCache> {
        if !self.cache.is_synchronized() {
            self.synchronize_list()?;
        }
        Ok(&self.cache)
    }

    /// Reload the folder list from the remote store.
    pub fn synchronize_list(&self) -> SdkResult<()> {
        self.cache.synchronize(self.context.store().as_ref())?;
        Ok(())
    }

    pub fn list_folders(&self) -> SdkResult<Vec<String>> {
        Ok(self.list_cache()?.folders())
    }

    pub fn folder_info(&self, path: &str) -> SdkResult<FolderInfo> {
        self.list_cache()?.folder(path).map_err(|e| match e {
            gws_list::ListError::FolderNotFound(path) => SdkError::FolderNotFound(path),
            other => other.into(),
        })
    }

    pub fn get_folder(&self, path: &str) -> SdkResult<FolderHandle> {
        Ok(FolderHandle::new(self.context.clone(), self.folder_info(path)?))
    }

    /// The configured user's default folder for `object_type`.
    pub fn default_folder(&self, object_type: &ObjectType) -> SdkResult<Option<FolderHandle>> {
        match self.list_cache()?.default_for(object_type)? {
            Some(path) => self.get_folder(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Folders of `object_type`; untyped folders count as mail.
    pub fn folders_by_type(&self, object_type: &ObjectType) -> SdkResult<Vec<String>> {
        Ok(self.list_cache()?.folders_by_type(object_type))
    }

    pub fn create_folder(&self, path: &str, folder_type: Option<&FolderType>) -> SdkResult<()> {
        self.manipulator.create_folder(path, folder_type)?;
        Ok(())
    }

    /// Create a folder from path segments relative to the namespace of
    /// `kind` and return its full path.
    pub fn create_folder_in<S: AsRef<str>>(
        &self,
        kind: NamespaceKind,
        segments: &[S],
        folder_type: Option<&FolderType>,
    ) -> SdkResult<String> {
        let path = self.context.resolver().qualified_name(kind, segments)?;
        self.create_folder(&path, folder_type)?;
        Ok(path)
    }

    pub fn delete_folder(&self, path: &str) -> SdkResult<()> {
        self.manipulator.delete_folder(path)?;
        Ok(())
    }

    pub fn rename_folder(&self, old: &str, new: &str) -> SdkResult<()> {
        self.manipulator.rename_folder(old, new)?;
        Ok(())
    }

    /// Add a listener after the list cache.
    pub fn register_listener(&mut self, listener: Arc<dyn FolderListener>) {
        self.manipulator.register_listener(listener);
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("context", &self.context)
            .field("listeners", &self.manipulator.listener_count())
            .field("cache", &self.cache)
            .finish()
    }
}
