use std::sync::Arc;

use gws_types::FolderType;
use tracing::{info, warn};

use crate::error::ListResult;
use crate::listener::FolderListener;
use crate::manipulator::ListManipulation;

/// Decorator that traces every folder mutation of the wrapped manipulator.
///
/// Each call emits one `info` event before delegating and one after it
/// completes. Failures are traced at `warn` and returned unchanged.
pub struct LoggedListManipulator<M> {
    inner: M,
}

impl<M: ListManipulation> LoggedListManipulator<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

fn type_label(folder_type: Option<&FolderType>) -> String {
    folder_type.map_or_else(|| "none".to_string(), FolderType::to_annotation)
}

impl<M: ListManipulation> ListManipulation for LoggedListManipulator<M> {
    fn create_folder(&self, path: &str, folder_type: Option<&FolderType>) -> ListResult<()> {
        let label = type_label(folder_type);
        info!(path, folder_type = %label, "starting folder creation");
        let result = self.inner.create_folder(path, folder_type);
        match &result {
            Ok(()) => info!(path, folder_type = %label, "completed folder creation"),
            Err(e) => warn!(path, folder_type = %label, error = %e, "folder creation failed"),
        }
        result
    }

    fn delete_folder(&self, path: &str) -> ListResult<()> {
        info!(path, "starting folder deletion");
        let result = self.inner.delete_folder(path);
        match &result {
            Ok(()) => info!(path, "completed folder deletion"),
            Err(e) => warn!(path, error = %e, "folder deletion failed"),
        }
        result
    }

    fn rename_folder(&self, old: &str, new: &str) -> ListResult<()> {
        info!(old, new, "starting folder rename");
        let result = self.inner.rename_folder(old, new);
        match &result {
            Ok(()) => info!(old, new, "completed folder rename"),
            Err(e) => warn!(old, new, error = %e, "folder rename failed"),
        }
        result
    }

    fn register_listener(&mut self, listener: Arc<dyn FolderListener>) {
        self.inner.register_listener(listener);
    }

    fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }
}
