use gws_types::FolderType;

/// Error raised by a listener while handling a folder mutation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("listener '{listener}' failed: {message}")]
pub struct ListenerError {
    pub listener: String,
    pub message: String,
}

impl ListenerError {
    pub fn new(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            message: message.into(),
        }
    }
}

/// Observer of folder list mutations.
///
/// Callbacks run after the remote mutation has been committed. The trait is
/// object-safe and `Send + Sync` so listeners can be shared as
/// `Arc<dyn FolderListener>` between the manipulator and their owner.
pub trait FolderListener: Send + Sync {
    /// Human-readable name used in error reports.
    fn name(&self) -> &str;

    fn on_folder_created(
        &self,
        path: &str,
        folder_type: Option<&FolderType>,
    ) -> Result<(), ListenerError>;

    fn on_folder_deleted(&self, path: &str) -> Result<(), ListenerError>;

    fn on_folder_renamed(&self, old: &str, new: &str) -> Result<(), ListenerError>;
}
