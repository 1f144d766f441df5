//! List-index cache: the folder list with types, owners, and defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use gws_namespace::NamespaceResolver;
use gws_store::RemoteStore;
use gws_types::{FolderType, NamespaceKind, ObjectType, ANNOTATION_FOLDER_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ListError, ListResult};
use crate::listener::{FolderListener, ListenerError};

/// What to do when an owner has two default folders of the same type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultHandling {
    /// Fail the query with [`ListError::DuplicateDefault`].
    Bail,
    /// Log a warning and keep the first folder in path order.
    #[default]
    Log,
}

/// Everything known about one folder of the list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub path: String,
    pub folder_type: Option<FolderType>,
    pub is_default: bool,
    pub owner: Option<String>,
    pub title: String,
    pub subpath: String,
    pub parent: Option<String>,
    pub namespace: NamespaceKind,
    pub prefix: String,
    pub delimiter: char,
}

impl FolderInfo {
    /// The object type stored in this folder; untyped folders hold mail.
    pub fn object_type(&self) -> ObjectType {
        self.folder_type
            .as_ref()
            .map_or(ObjectType::Mail, |t| t.object_type.clone())
    }
}

#[derive(Debug, Default)]
struct ListIndex {
    folders: BTreeSet<String>,
    types: BTreeMap<String, FolderType>,
    synchronized: bool,
}

/// Folder list cache kept current through listener callbacks.
///
/// [`synchronize`](Self::synchronize) rebuilds the index from the remote
/// store. Once registered with a manipulator, the index follows every
/// create, delete, and rename without another remote round trip.
pub struct FolderListCache {
    resolver: NamespaceResolver,
    default_handling: DefaultHandling,
    index: RwLock<ListIndex>,
}

impl FolderListCache {
    pub fn new(resolver: NamespaceResolver, default_handling: DefaultHandling) -> Self {
        Self {
            resolver,
            default_handling,
            index: RwLock::new(ListIndex::default()),
        }
    }

    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    /// Whether the index has been loaded from the remote store.
    pub fn is_synchronized(&self) -> bool {
        self.index.read().expect("lock poisoned").synchronized
    }

    /// Reload the folder list and folder-type annotations.
    pub fn synchronize(&self, store: &dyn RemoteStore) -> ListResult<()> {
        let folders: BTreeSet<String> = store.list()?.into_iter().collect();
        let mut types = BTreeMap::new();
        for (path, value) in store.list_annotation(ANNOTATION_FOLDER_TYPE)? {
            match FolderType::parse(&value) {
                Ok(folder_type) => {
                    types.insert(path, folder_type);
                }
                Err(e) => warn!(path = %path, error = %e, "ignoring invalid folder type annotation"),
            }
        }
        debug!(folders = folders.len(), typed = types.len(), "folder list synchronized");

        let mut index = self.index.write().expect("lock poisoned");
        index.folders = folders;
        index.types = types;
        index.synchronized = true;
        Ok(())
    }

    /// All folder paths, sorted.
    pub fn folders(&self) -> Vec<String> {
        let index = self.index.read().expect("lock poisoned");
        index.folders.iter().cloned().collect()
    }

    /// Folder types keyed by path, for typed folders only.
    pub fn folder_types(&self) -> BTreeMap<String, FolderType> {
        self.index.read().expect("lock poisoned").types.clone()
    }

    pub fn folder_type(&self, path: &str) -> Option<FolderType> {
        self.index.read().expect("lock poisoned").types.get(path).cloned()
    }

    /// Folders holding objects of `object_type`. Untyped folders count as
    /// mail folders.
    pub fn folders_by_type(&self, object_type: &ObjectType) -> Vec<String> {
        let index = self.index.read().expect("lock poisoned");
        index
            .folders
            .iter()
            .filter(|path| match index.types.get(*path) {
                Some(t) => &t.object_type == object_type,
                None => *object_type == ObjectType::Mail,
            })
            .cloned()
            .collect()
    }

    /// Owner of every folder, keyed by path.
    pub fn owners(&self) -> BTreeMap<String, Option<String>> {
        let index = self.index.read().expect("lock poisoned");
        index
            .folders
            .iter()
            .map(|path| (path.clone(), self.resolver.owner(path)))
            .collect()
    }

    /// Default folders: owner, then object type, to folder path.
    pub fn defaults(&self) -> ListResult<BTreeMap<String, BTreeMap<ObjectType, String>>> {
        let index = self.index.read().expect("lock poisoned");
        let mut defaults: BTreeMap<String, BTreeMap<ObjectType, String>> = BTreeMap::new();
        for (path, folder_type) in index.types.iter().filter(|(_, t)| t.is_default) {
            let Some(owner) = self.resolver.owner(path) else {
                continue;
            };
            let by_type = defaults.entry(owner.clone()).or_default();
            match by_type.get(&folder_type.object_type) {
                None => {
                    by_type.insert(folder_type.object_type.clone(), path.clone());
                }
                Some(first) => match self.default_handling {
                    DefaultHandling::Bail => {
                        return Err(ListError::DuplicateDefault {
                            owner,
                            folder_type: folder_type.object_type.to_string(),
                            first: first.clone(),
                            second: path.clone(),
                        });
                    }
                    DefaultHandling::Log => warn!(
                        owner = %owner,
                        folder_type = %folder_type.object_type,
                        kept = %first,
                        ignored = %path,
                        "duplicate default folder"
                    ),
                },
            }
        }
        Ok(defaults)
    }

    /// Default folders of the configured user.
    pub fn personal_defaults(&self) -> ListResult<BTreeMap<ObjectType, String>> {
        Ok(self
            .defaults()?
            .remove(self.resolver.user())
            .unwrap_or_default())
    }

    /// The configured user's default folder for `object_type`.
    pub fn default_for(&self, object_type: &ObjectType) -> ListResult<Option<String>> {
        Ok(self.personal_defaults()?.remove(object_type))
    }

    /// Full description of one folder.
    pub fn folder(&self, path: &str) -> ListResult<FolderInfo> {
        let folder_type = {
            let index = self.index.read().expect("lock poisoned");
            if !index.folders.contains(path) {
                return Err(ListError::FolderNotFound(path.to_string()));
            }
            index.types.get(path).cloned()
        };
        let element = self.resolver.classify(path);
        Ok(FolderInfo {
            path: path.to_string(),
            is_default: folder_type.as_ref().is_some_and(|t| t.is_default),
            folder_type,
            owner: self.resolver.owner(path),
            title: element.title(path),
            subpath: element.subpath(path),
            parent: element.parent(path),
            namespace: element.kind(),
            prefix: element.prefix().to_string(),
            delimiter: element.delimiter(),
        })
    }
}

impl FolderListener for FolderListCache {
    fn name(&self) -> &str {
        "folder-list-cache"
    }

    fn on_folder_created(
        &self,
        path: &str,
        folder_type: Option<&FolderType>,
    ) -> Result<(), ListenerError> {
        let mut index = self.index.write().expect("lock poisoned");
        index.folders.insert(path.to_string());
        match folder_type {
            Some(t) => index.types.insert(path.to_string(), t.clone()),
            None => index.types.remove(path),
        };
        Ok(())
    }

    fn on_folder_deleted(&self, path: &str) -> Result<(), ListenerError> {
        let mut index = self.index.write().expect("lock poisoned");
        index.folders.remove(path);
        index.types.remove(path);
        Ok(())
    }

    fn on_folder_renamed(&self, old: &str, new: &str) -> Result<(), ListenerError> {
        let mut index = self.index.write().expect("lock poisoned");
        index.folders.remove(old);
        index.folders.insert(new.to_string());
        if let Some(t) = index.types.remove(old) {
            index.types.insert(new.to_string(), t);
        }
        Ok(())
    }
}

impl std::fmt::Debug for FolderListCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.index.read().expect("lock poisoned").folders.len();
        f.debug_struct("FolderListCache")
            .field("folder_count", &count)
            .field("default_handling", &self.default_handling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gws_store::InMemoryRemoteStore;

    use super::*;
    use crate::manipulator::{ListManipulation, ListManipulator};

    fn cache(handling: DefaultHandling) -> FolderListCache {
        FolderListCache::new(NamespaceResolver::fixed("john@example.org"), handling)
    }

    fn populated_store() -> InMemoryRemoteStore {
        let store = InMemoryRemoteStore::new();
        for (path, ty) in [
            ("INBOX", None),
            ("INBOX/Calendar", Some("event.default")),
            ("INBOX/Work", Some("event")),
            ("INBOX/Contacts", Some("contact.default")),
            ("user/jane/Calendar", Some("event.default")),
            ("Public/Notes", Some("note")),
        ] {
            store.create(path).unwrap();
            if let Some(ty) = ty {
                store.set_annotation(path, ANNOTATION_FOLDER_TYPE, ty).unwrap();
            }
        }
        store
    }

    // -----------------------------------------------------------------------
    // Synchronization and queries
    // -----------------------------------------------------------------------

    #[test]
    fn synchronize_loads_folders_and_types() {
        let c = cache(DefaultHandling::Bail);
        assert!(!c.is_synchronized());
        c.synchronize(&populated_store()).unwrap();
        assert!(c.is_synchronized());
        assert_eq!(c.folders().len(), 6);
        assert_eq!(c.folder_types().len(), 5);
        assert_eq!(
            c.folders_by_type(&ObjectType::Event),
            vec!["INBOX/Calendar", "INBOX/Work", "user/jane/Calendar"]
        );
        assert_eq!(c.folders_by_type(&ObjectType::Mail), vec!["INBOX"]);
    }

    #[test]
    fn owners_by_namespace() {
        let c = cache(DefaultHandling::Bail);
        c.synchronize(&populated_store()).unwrap();
        let owners = c.owners();
        assert_eq!(owners["INBOX/Work"].as_deref(), Some("john@example.org"));
        assert_eq!(owners["user/jane/Calendar"].as_deref(), Some("jane@example.org"));
        assert_eq!(owners["Public/Notes"].as_deref(), Some("Public"));
    }

    #[test]
    fn defaults_per_owner() {
        let c = cache(DefaultHandling::Bail);
        c.synchronize(&populated_store()).unwrap();
        let defaults = c.defaults().unwrap();
        assert_eq!(defaults["jane@example.org"][&ObjectType::Event], "user/jane/Calendar");
        assert_eq!(
            c.default_for(&ObjectType::Event).unwrap().as_deref(),
            Some("INBOX/Calendar")
        );
        assert_eq!(c.default_for(&ObjectType::Note).unwrap(), None);
        assert_eq!(c.personal_defaults().unwrap().len(), 2);
    }

    #[test]
    fn duplicate_default_bails_or_logs() {
        let store = populated_store();
        store
            .set_annotation("INBOX/Work", ANNOTATION_FOLDER_TYPE, "event.default")
            .unwrap();

        let strict = cache(DefaultHandling::Bail);
        strict.synchronize(&store).unwrap();
        assert!(matches!(
            strict.defaults(),
            Err(ListError::DuplicateDefault { .. })
        ));

        let lenient = cache(DefaultHandling::Log);
        lenient.synchronize(&store).unwrap();
        assert_eq!(
            lenient.default_for(&ObjectType::Event).unwrap().as_deref(),
            Some("INBOX/Calendar")
        );
    }

    #[test]
    fn folder_info_describes_path() {
        let c = cache(DefaultHandling::Bail);
        c.synchronize(&populated_store()).unwrap();
        let info = c.folder("user/jane/Calendar").unwrap();
        assert_eq!(info.namespace, NamespaceKind::Other);
        assert_eq!(info.title, "jane:Calendar");
        assert_eq!(info.subpath, "jane/Calendar");
        assert_eq!(info.parent.as_deref(), Some("user/jane"));
        assert_eq!(info.prefix, "user");
        assert_eq!(info.delimiter, '/');
        assert!(info.is_default);
        assert_eq!(info.object_type(), ObjectType::Event);

        assert!(matches!(c.folder("missing"), Err(ListError::FolderNotFound(_))));
    }

    // -----------------------------------------------------------------------
    // Listener updates
    // -----------------------------------------------------------------------

    #[test]
    fn manipulations_update_index_without_remote_reads() {
        let store = Arc::new(populated_store());
        let c = Arc::new(cache(DefaultHandling::Bail));
        c.synchronize(store.as_ref()).unwrap();

        let mut m = ListManipulator::new(store.clone());
        m.register_listener(c.clone());
        store.reset_calls();

        m.create_folder("INBOX/Notes", Some(&FolderType::default_of(ObjectType::Note)))
            .unwrap();
        m.rename_folder("INBOX/Work", "INBOX/Projects").unwrap();
        m.delete_folder("Public/Notes").unwrap();

        assert_eq!(store.call_count("list"), 0);
        assert_eq!(store.call_count("list_annotation"), 0);
        assert_eq!(
            c.default_for(&ObjectType::Note).unwrap().as_deref(),
            Some("INBOX/Notes")
        );
        assert_eq!(
            c.folder_type("INBOX/Projects"),
            Some(FolderType::new(ObjectType::Event))
        );
        assert!(c.folder("INBOX/Work").is_err());
        assert!(c.folder("Public/Notes").is_err());

        // The incremental index matches a fresh load.
        let fresh = cache(DefaultHandling::Bail);
        fresh.synchronize(store.as_ref()).unwrap();
        assert_eq!(fresh.folders(), c.folders());
        assert_eq!(fresh.folder_types(), c.folder_types());
    }
}
