//! Workbook and owner records produced by the BI platform client

use serde::{Deserialize, Serialize};
use std::fmt;

/// A lightweight handle on a workbook, used as a mapping key before the
/// full metadata is fetched.
///
/// Equality, hashing and ordering are structural over `(id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkbookReference {
    /// Platform-native id (the Tableau LUID)
    pub id: String,

    /// Display name
    pub name: String,
}

impl WorkbookReference {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkbookReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Descriptive workbook metadata, as reported by the REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookDetails {
    /// Platform-native id
    pub id: String,

    /// Display name
    pub name: String,

    /// Free-text description, if the author wrote one
    #[serde(default)]
    pub description: Option<String>,

    /// Web-accessible URL, as reported by the platform
    pub webpage_url: String,

    /// Id of the owning user
    pub owner_id: String,

    /// Name of the project (folder) the workbook lives in
    pub project_name: String,

    /// Workbook tags, in platform order
    #[serde(default)]
    pub tags: Vec<String>,

    /// Creation timestamp, kept verbatim
    #[serde(default)]
    pub created_at: String,

    /// Last update timestamp, kept verbatim
    #[serde(default)]
    pub updated_at: String,
}

/// Owner metadata.
///
/// The platform's `name` is the login, which in practice is an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: String,

    /// Human readable full name
    #[serde(default)]
    pub fullname: String,

    /// Login name (email)
    pub name: String,
}
