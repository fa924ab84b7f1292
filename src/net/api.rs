//! Typed helpers for the backend endpoints the product pages call.
//!
//! Every helper goes through [`SessionStore::authenticated_request`], so a
//! 401 here signs the user out exactly like any other request.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use serde_json::Value;

use super::types::NotesPage;
use crate::state::session::{RequestOptions, SessionError, SessionStore};

/// Filters and paging for `GET /notes`. Unset fields are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotesQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Sort column, e.g. `created_at`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
    pub category: Option<String>,
    /// Notes carrying any of these tags. Sent as a repeated `tags` parameter.
    pub tags: Vec<String>,
    pub search: Option<String>,
    /// `Some(false)` asks for previews only; the backend includes content by default.
    pub include_content: Option<bool>,
}

impl NotesQuery {
    /// Newest notes first, `limit` per page.
    #[must_use]
    pub fn recent(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            sort: Some("created_at".to_owned()),
            order: Some("desc".to_owned()),
            ..Self::default()
        }
    }

    /// `?key=value&...` for the set fields, or an empty string.
    #[must_use]
    pub fn query_string(&self) -> String {
        let limit = self.limit.map(|v| v.to_string());
        let offset = self.offset.map(|v| v.to_string());
        let include_content = self.include_content.map(|v| v.to_string());
        let mut pairs = vec![
            ("limit", limit.as_deref()),
            ("offset", offset.as_deref()),
            ("sort", self.sort.as_deref()),
            ("order", self.order.as_deref()),
            ("category", self.category.as_deref()),
        ];
        pairs.extend(self.tags.iter().map(|tag| ("tags", Some(tag.as_str()))));
        pairs.push(("search", self.search.as_deref()));
        pairs.push(("include_content", include_content.as_deref()));

        let encoded: Vec<String> = pairs
            .iter()
            .filter_map(|(key, value)| value.map(|v| format!("{key}={}", urlencoding::encode(v))))
            .collect();
        if encoded.is_empty() {
            String::new()
        } else {
            format!("?{}", encoded.join("&"))
        }
    }
}

fn notes_endpoint(query: &NotesQuery) -> String {
    format!("/notes{}", query.query_string())
}

/// Fetch one page of the user's notes.
///
/// # Errors
///
/// Propagates [`SessionError`] from the request; a body that is not a
/// notes page is [`SessionError::Decode`].
pub async fn list_notes(session: &SessionStore, query: &NotesQuery) -> Result<NotesPage, SessionError> {
    let body = session.authenticated_request(&notes_endpoint(query), RequestOptions::get()).await?;
    if body.is_null() {
        return Ok(NotesPage::default());
    }
    serde_json::from_value(body).map_err(|e| SessionError::Decode(e.to_string()))
}

/// Fetch the AI processing statistics object from `GET /ai/stats`.
///
/// # Errors
///
/// Propagates [`SessionError`] from the request.
pub async fn ai_stats(session: &SessionStore) -> Result<Value, SessionError> {
    session.authenticated_request("/ai/stats", RequestOptions::get()).await
}
