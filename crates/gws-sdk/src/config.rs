//! Storage configuration, loadable from TOML.
//!
//! ```toml
//! user = "john@example.org"
//! history = true
//! log_list_manipulation = true
//! default_handling = "bail"
//!
//! [[namespaces]]
//! kind = "personal"
//! prefix = "INBOX"
//! delimiter = "/"
//!
//! [[namespaces]]
//! kind = "other"
//! prefix = "user"
//! ```

use std::path::Path;

use gws_format::FormatParams;
use gws_list::DefaultHandling;
use gws_namespace::{NamespaceElement, NamespaceResolver};
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// The authenticated owner of the personal namespace.
    pub user: String,
    /// Ordered namespace elements. Empty means the fixed layout.
    pub namespaces: Vec<NamespaceElement>,
    /// Payload format engine name.
    pub format: String,
    pub format_version: String,
    /// Keep an object history and allow history queries.
    pub history: bool,
    /// Trace every folder mutation.
    pub log_list_manipulation: bool,
    pub default_handling: DefaultHandling,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            namespaces: Vec::new(),
            format: "xml".into(),
            format_version: FormatParams::default().version,
            history: true,
            log_list_manipulation: false,
            default_handling: DefaultHandling::default(),
        }
    }
}

impl StorageConfig {
    /// Default configuration for `user`.
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.user.trim().is_empty() {
            return Err(SdkError::Config("user must be set".into()));
        }
        if self.format.is_empty() {
            return Err(SdkError::Config("format must be set".into()));
        }
        Ok(())
    }

    /// Namespace resolver for the configured layout.
    ///
    /// The first shared element becomes the catch-all; without one, an
    /// empty-prefix shared element is used.
    pub fn resolver(&self) -> NamespaceResolver {
        if self.namespaces.is_empty() {
            NamespaceResolver::fixed(self.user.clone())
        } else {
            NamespaceResolver::from_elements(self.user.clone(), self.namespaces.clone())
        }
    }

    pub fn format_params(&self) -> FormatParams {
        FormatParams {
            version: self.format_version.clone(),
            ..FormatParams::default()
        }
    }
}
