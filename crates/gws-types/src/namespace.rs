use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Ownership scope of a folder path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    /// Folders owned by the authenticated user.
    Personal,
    /// Folders of other users that were shared with the current user.
    Other,
    /// Folders without a personal owner.
    Shared,
}

impl NamespaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Other => "other",
            Self::Shared => "shared",
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamespaceKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Self::Personal),
            "other" => Ok(Self::Other),
            "shared" => Ok(Self::Shared),
            other => Err(TypeError::UnknownNamespaceKind(other.to_string())),
        }
    }
}
