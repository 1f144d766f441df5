use std::sync::Arc;

use gws_store::RemoteStore;
use gws_types::{FolderType, ANNOTATION_FOLDER_TYPE};
use tracing::debug;

use crate::error::{ListError, ListOperation, ListResult};
use crate::listener::{FolderListener, ListenerError};

/// Folder create/delete/rename with listener notification.
pub trait ListManipulation: Send + Sync {
    /// Create a folder, annotating its type when one is given.
    fn create_folder(&self, path: &str, folder_type: Option<&FolderType>) -> ListResult<()>;

    fn delete_folder(&self, path: &str) -> ListResult<()>;

    fn rename_folder(&self, old: &str, new: &str) -> ListResult<()>;

    /// Append a listener. Listeners are not de-duplicated.
    fn register_listener(&mut self, listener: Arc<dyn FolderListener>);

    fn listener_count(&self) -> usize;
}

/// The base manipulator: remote mutation first, then ordered, fail-fast
/// listener notification.
pub struct ListManipulator {
    store: Arc<dyn RemoteStore>,
    listeners: Vec<Arc<dyn FolderListener>>,
}

impl ListManipulator {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    fn notify<F>(&self, operation: ListOperation, path: &str, callback: F) -> ListResult<()>
    where
        F: Fn(&dyn FolderListener) -> Result<(), ListenerError>,
    {
        for (notified, listener) in self.listeners.iter().enumerate() {
            if let Err(source) = callback(listener.as_ref()) {
                return Err(ListError::Listener {
                    operation,
                    path: path.to_string(),
                    notified,
                    source,
                });
            }
        }
        debug!(%operation, path, listeners = self.listeners.len(), "listeners notified");
        Ok(())
    }
}

impl ListManipulation for ListManipulator {
    fn create_folder(&self, path: &str, folder_type: Option<&FolderType>) -> ListResult<()> {
        self.store.create(path)?;
        if let Some(folder_type) = folder_type {
            self.store
                .set_annotation(path, ANNOTATION_FOLDER_TYPE, &folder_type.to_annotation())?;
        }
        self.notify(ListOperation::Create, path, |l| {
            l.on_folder_created(path, folder_type)
        })
    }

    fn delete_folder(&self, path: &str) -> ListResult<()> {
        self.store.delete(path)?;
        self.notify(ListOperation::Delete, path, |l| l.on_folder_deleted(path))
    }

    fn rename_folder(&self, old: &str, new: &str) -> ListResult<()> {
        self.store.rename(old, new)?;
        self.notify(ListOperation::Rename, old, |l| l.on_folder_renamed(old, new))
    }

    fn register_listener(&mut self, listener: Arc<dyn FolderListener>) {
        self.listeners.push(listener);
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for ListManipulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListManipulator")
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}
