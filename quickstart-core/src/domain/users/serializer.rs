//! Two-field wire mapping for user documents.
//!
//! The users endpoint exposes exactly `username` and `email`. The exposed
//! fields and their validators are declared once in [`USER_FIELDS`]; nothing
//! else on a [`UserDocument`] is read from a payload or written to a response.
//!
//! Validation runs every field and collects all messages before failing, so a
//! client sees every problem with its payload in one response. Uniqueness of
//! `username` needs the collection and is checked by the viewset on top of
//! what is done here.

use std::{collections::BTreeMap, fmt};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::user::UserDocument;

/// Longest accepted username, in characters.
pub const USERNAME_MAX_LENGTH: usize = 150;
/// Longest accepted email address, in characters.
pub const EMAIL_MAX_LENGTH: usize = 254;

/// Error key for problems that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Missing field on create or full update.
pub const MSG_REQUIRED: &str = "This field is required.";
/// Explicit JSON `null`.
pub const MSG_NULL: &str = "This field may not be null.";
/// Empty or whitespace-only value on a field that requires content.
pub const MSG_BLANK: &str = "This field may not be blank.";
/// Boolean, array or object supplied for a string field.
pub const MSG_NOT_A_STRING: &str = "Not a valid string.";
/// Username already held by another document.
pub const MSG_UNIQUE: &str = "This field must be unique.";
/// Username outside letters, digits and `@.+-_`.
pub const MSG_INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
/// Malformed email address.
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username regex should compile"));

static EMAIL_USER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-!#$%&'*+/=?^_`{}|~0-9A-Za-z]+(?:\.[-!#$%&'*+/=?^_`{}|~0-9A-Za-z]+)*$")
        .expect("email user regex should compile")
});

static EMAIL_DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9-]{2,63}$")
        .expect("email domain regex should compile")
});

const EMAIL_DOMAIN_ALLOWLIST: [&str; 1] = ["localhost"];

/// Declaration of one exposed field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Key in payloads and representations.
    pub name: &'static str,
    /// Must be present on create and full update.
    pub required: bool,
    /// An empty (after trimming) value is accepted and stored as `""`.
    pub allow_blank: bool,
    /// Character limit, checked after trimming.
    pub max_length: usize,
    /// Format check run on non-blank values.
    pub validator: fn(&str) -> Result<(), &'static str>,
}

/// Every field the users endpoint reads or writes.
pub const USER_FIELDS: [FieldSpec; 2] = [
    FieldSpec {
        name: "username",
        required: true,
        allow_blank: false,
        max_length: USERNAME_MAX_LENGTH,
        validator: validate_username,
    },
    FieldSpec {
        name: "email",
        required: false,
        allow_blank: true,
        max_length: EMAIL_MAX_LENGTH,
        validator: validate_email,
    },
];

fn validate_username(value: &str) -> Result<(), &'static str> {
    if USERNAME_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(MSG_INVALID_USERNAME)
    }
}

fn validate_email(value: &str) -> Result<(), &'static str> {
    let Some((user, domain)) = value.rsplit_once('@') else {
        return Err(MSG_INVALID_EMAIL);
    };

    if !EMAIL_USER_PATTERN.is_match(user) {
        return Err(MSG_INVALID_EMAIL);
    }

    let domain_ok = EMAIL_DOMAIN_ALLOWLIST.contains(&domain)
        || (EMAIL_DOMAIN_PATTERN.is_match(domain) && !domain.ends_with('-'));

    if domain_ok { Ok(()) } else { Err(MSG_INVALID_EMAIL) }
}

impl FieldSpec {
    /// Normalize and validate a raw string value, collecting every message.
    fn clean(&self, raw: &str) -> Result<String, Vec<String>> {
        let value = raw.trim();

        if value.is_empty() {
            return if self.allow_blank {
                Ok(String::new())
            } else {
                Err(vec![MSG_BLANK.to_string()])
            };
        }

        let mut messages = Vec::new();
        if value.chars().count() > self.max_length {
            messages.push(format!(
                "Ensure this field has no more than {} characters.",
                self.max_length
            ));
        }
        if let Err(message) = (self.validator)(value) {
            messages.push(message.to_string());
        }

        if messages.is_empty() {
            Ok(value.to_string())
        } else {
            Err(messages)
        }
    }
}

/// Which operation a payload is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// New document (POST).
    Create,
    /// Full replacement of the exposed fields (PUT).
    Update,
    /// Only the supplied fields are validated and changed (PATCH).
    PartialUpdate,
}

impl ValidationMode {
    /// Whether absent fields are left alone instead of required.
    pub fn is_partial(self) -> bool {
        matches!(self, Self::PartialUpdate)
    }
}

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// An empty error map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single message on a single field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Append `message` to the messages already held for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// True when no field failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for one field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Every field with its messages, sorted by field name.
    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid user payload")?;
        for (field, messages) in &self.0 {
            write!(f, "; {}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validated changes to the exposed fields. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserChangeSet {
    /// Cleaned username, if it changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Cleaned email, if it changes. `Some("")` clears it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserChangeSet {
    /// True when no exposed field changes.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }

    /// The change set as a JSON object holding only the changed keys, ready to
    /// be merged into a stored document.
    pub fn to_patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(username) = &self.username {
            patch.insert("username".to_string(), Value::String(username.clone()));
        }
        if let Some(email) = &self.email {
            patch.insert("email".to_string(), Value::String(email.clone()));
        }
        patch
    }

    /// Write the changed fields onto `doc`, leaving everything else.
    pub fn apply_to(&self, doc: &mut UserDocument) {
        if let Some(username) = &self.username {
            doc.username.clone_from(username);
        }
        if let Some(email) = &self.email {
            doc.email.clone_from(email);
        }
    }

    /// A new document from a change set validated in [`ValidationMode::Create`].
    pub fn into_document(self) -> UserDocument {
        UserDocument::new(
            self.username.unwrap_or_default(),
            self.email.unwrap_or_default(),
        )
    }
}

/// Wire representation of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRepresentation {
    /// Stored username.
    pub username: String,
    /// Stored email, `""` when none was given.
    pub email: String,
}

impl From<&UserDocument> for UserRepresentation {
    fn from(doc: &UserDocument) -> Self {
        Self {
            username: doc.username.clone(),
            email: doc.email.clone(),
        }
    }
}

/// Converts between [`UserDocument`] and [`UserRepresentation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserSerializer;

impl UserSerializer {
    /// Exposed field names, in declaration order.
    pub fn field_names() -> impl Iterator<Item = &'static str> {
        USER_FIELDS.iter().map(|spec| spec.name)
    }

    /// The `{username, email}` view of a document.
    pub fn to_representation(doc: &UserDocument) -> UserRepresentation {
        UserRepresentation::from(doc)
    }

    /// Validate an inbound payload. Keys outside [`USER_FIELDS`] are ignored.
    pub fn validate(payload: &Value, mode: ValidationMode) -> Result<UserChangeSet, ValidationErrors> {
        let object = match payload {
            Value::Object(object) => object,
            Value::Null => {
                return Err(ValidationErrors::single(NON_FIELD_ERRORS, "No data provided."));
            }
            other => {
                return Err(ValidationErrors::single(
                    NON_FIELD_ERRORS,
                    format!(
                        "Invalid data. Expected a dictionary, but got {}.",
                        json_type_name(other)
                    ),
                ));
            }
        };

        let mut errors = ValidationErrors::new();
        let mut cleaned: BTreeMap<&'static str, String> = BTreeMap::new();

        for spec in &USER_FIELDS {
            let result = match object.get(spec.name) {
                None => {
                    if spec.required && !mode.is_partial() {
                        errors.add(spec.name, MSG_REQUIRED);
                    }
                    continue;
                }
                Some(Value::Null) => Err(vec![MSG_NULL.to_string()]),
                Some(Value::String(raw)) => spec.clean(raw),
                Some(Value::Number(number)) => spec.clean(&number.to_string()),
                Some(_) => Err(vec![MSG_NOT_A_STRING.to_string()]),
            };

            match result {
                Ok(value) => {
                    cleaned.insert(spec.name, value);
                }
                Err(messages) => {
                    for message in messages {
                        errors.add(spec.name, message);
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut changes = UserChangeSet {
            username: cleaned.remove("username"),
            email: cleaned.remove("email"),
        };
        if mode == ValidationMode::Create && changes.email.is_none() {
            changes.email = Some(String::new());
        }

        Ok(changes)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
