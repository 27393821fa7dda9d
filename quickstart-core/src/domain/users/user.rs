//! Stored user documents.
//!
//! A [`UserDocument`] is the complete record kept in the user collection. It
//! carries the authentication fields owned by whichever subsystem handles
//! registration and login (password hash, flags, timestamps) next to the two
//! fields exposed by the users endpoint. Keys written by other subsystems that
//! this schema does not know about are kept in [`UserDocument::extra`] and are
//! written back unchanged.
//!
//! The document identifier is the collection key. It is not part of the
//! serialized document body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A user record as stored in the document collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    /// Collection key (UUIDv7, assigned on insertion).
    #[serde(skip)]
    pub id: Uuid,
    /// Unique login name.
    #[serde(default)]
    pub username: String,
    /// Contact address, empty when unknown.
    #[serde(default)]
    pub email: String,
    /// Password hash; empty means no usable password.
    #[serde(default)]
    pub password: String,
    /// Profile given name.
    #[serde(default)]
    pub first_name: String,
    /// Profile family name.
    #[serde(default)]
    pub last_name: String,
    /// Inactive accounts cannot log in.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Admin site access.
    #[serde(default)]
    pub is_staff: bool,
    /// Holds every permission.
    #[serde(default)]
    pub is_superuser: bool,
    /// Most recent login.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    /// Creation time, `None` when the stored document has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_joined: Option<DateTime<Utc>>,
    /// Any other keys present in the stored document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl UserDocument {
    /// Build a fresh document with schema defaults for every hidden field.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            email: email.into(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            date_joined: Some(Utc::now()),
            extra: Map::new(),
        }
    }

    /// Attach the collection key to a document body read back from storage.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Whether the document holds a usable password hash.
    pub fn has_usable_password(&self) -> bool {
        !self.password.is_empty()
    }
}
