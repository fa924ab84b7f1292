//! Client-side state for the notes web app: the authenticated session and
//! the light/dark display preference.
//!
//! ARCHITECTURE
//! ============
//! - [`state::session::SessionStore`] owns the bearer credential and routes
//!   every backend call through one authenticated request path.
//! - [`state::theme::ThemeStore`] owns the display preference and the
//!   document-root marker.
//! - [`storage`] is the durable key-value seam both stores persist through.
//! - [`net::transport`] is the HTTP seam; [`net::api`] adds typed helpers.
//! - [`context::AppContext`] builds and shares both stores.

pub mod config;
pub mod context;
pub mod net;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
