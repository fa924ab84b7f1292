//! Wire DTOs for the notes backend REST API.
//!
//! DESIGN
//! ======
//! The backend is loosely typed: user ids arrive as numbers from some
//! deployments and UUID strings from others, and profile records carry
//! more fields than the client cares about. These types accept both and
//! keep the extras so nothing is lost when a profile is echoed back.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend-assigned user identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// The authenticated user's profile as returned by `/auth/*` endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "phone_number")]
    pub phone: Option<String>,
    #[serde(default, alias = "avatar_url")]
    pub avatar: Option<String>,
    /// Profile fields the client does not interpret (subscription, preferences, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Minimal user with only an id and display name.
    #[must_use]
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            email: None,
            phone: None,
            avatar: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// `POST /auth/login` request body.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/register` request body. The backend rejects a `null`
/// phone, so an absent one is left out entirely.
#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
}

/// Success body of `/auth/login` and `/auth/register`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub user: User,
    pub access_token: String,
}

/// Success body of `GET /auth/me`.
#[derive(Debug, Deserialize)]
pub(crate) struct MeResponse {
    pub user: User,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Extract the `error` field from a raw body, if there is one.
    pub(crate) fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.is_empty())
    }
}

/// Result of a sign-in attempt. Login and register never fail with an
/// `Err`; every failure is folded into [`AuthOutcome::Failure`].
#[derive(Clone, Debug, PartialEq)]
pub enum AuthOutcome {
    Success { user: User },
    Failure { error: String },
}

impl AuthOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Success { user } => Some(user),
            Self::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    /// JSON rendering in the `{ success, user | error }` shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Success { user } => serde_json::json!({ "success": true, "user": user }),
            Self::Failure { error } => serde_json::json!({ "success": false, "error": error }),
        }
    }
}

/// A note as listed by `GET /notes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Where the note came from (`whatsapp`, `web`, ...).
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub ai_processed_at: Option<String>,
}

/// Pagination block attached to `GET /notes`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

/// One page of `GET /notes`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NotesPage {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}
