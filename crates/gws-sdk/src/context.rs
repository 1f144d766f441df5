use std::sync::Arc;

use gws_format::{Envelope, FormatFactory, ObjectCodec, ObjectLoader};
use gws_history::{HistoryStorage, InMemoryHistory};
use gws_namespace::NamespaceResolver;
use gws_store::RemoteStore;
use gws_types::ObjectType;

use crate::config::StorageConfig;
use crate::error::SdkResult;

/// The collaborators a [`Storage`](crate::Storage) works with.
///
/// Built once and passed down explicitly; cloning shares the store and the
/// history log.
#[derive(Clone)]
pub struct StorageContext {
    config: StorageConfig,
    store: Arc<dyn RemoteStore>,
    history: Arc<dyn HistoryStorage>,
    resolver: NamespaceResolver,
    formats: FormatFactory,
}

impl StorageContext {
    /// Context with an in-memory history log.
    pub fn new(config: StorageConfig, store: Arc<dyn RemoteStore>) -> SdkResult<Self> {
        config.validate()?;
        Ok(Self {
            resolver: config.resolver(),
            config,
            store,
            history: Arc::new(InMemoryHistory::new()),
            formats: FormatFactory::new(),
        })
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStorage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_resolver(mut self, resolver: NamespaceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn history(&self) -> &Arc<dyn HistoryStorage> {
        &self.history
    }

    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    /// Codec for payloads of `object_type`. Mail is passed through raw.
    pub fn codec(&self, object_type: &ObjectType) -> SdkResult<ObjectCodec> {
        if !object_type.is_groupware() {
            return Ok(ObjectCodec::Raw);
        }
        let engine = self
            .formats
            .create(&self.config.format, object_type, &self.config.format_params())?;
        Ok(ObjectCodec::format(engine))
    }

    /// Loader for folders of `object_type`.
    ///
    /// Groupware loaders also carry a codec for every other groupware type,
    /// so a document whose `X-Kolab-Type` names a different type still
    /// parses.
    pub fn loader(&self, object_type: &ObjectType) -> SdkResult<ObjectLoader> {
        let mut loader = ObjectLoader::new(object_type.clone(), self.codec(object_type)?);
        if object_type.is_groupware() {
            for other in ObjectType::groupware() {
                if other != *object_type {
                    let codec = self.codec(&other)?;
                    loader = loader.with_codec(other, codec);
                }
            }
        }
        Ok(loader)
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::new(
            self.config.user.clone(),
            self.config.format_params().product_id,
        )
    }
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("user", &self.config.user)
            .field("format", &self.config.format)
            .field("history", &self.config.history)
            .finish()
    }
}
