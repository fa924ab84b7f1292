//! Application root that owns the shared stores.
//!
//! DESIGN
//! ======
//! `AppContext` is built once at startup and cloned into whatever needs a
//! store. Construction fails fast, before any network call, when a
//! required collaborator is missing, so a consumer can never observe a
//! store that was not wired up.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::net::transport::{HttpTransport, ReqwestTransport, TransportError};
use crate::state::session::SessionStore;
use crate::state::theme::{ClassList, Theme, ThemeRoot, ThemeStore};
use crate::storage::{FileStore, KeyValueStore};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("app context is missing its {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Both stores, shared. Clones point at the same stores.
#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<SessionStore>,
    pub theme: Arc<ThemeStore>,
}

impl AppContext {
    #[must_use]
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    /// Production wiring: reqwest transport, file-backed storage under
    /// `config.state_dir`, in-memory document root.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Transport`] if the HTTP client cannot be built.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, ContextError> {
        let transport = ReqwestTransport::new(config)?;
        Self::builder()
            .transport(Arc::new(transport))
            .storage(Arc::new(FileStore::new(config.storage_path())))
            .base_url(&config.api_base_url)
            .system_theme(config.system_theme)
            .build()
            .await
    }
}

#[derive(Default)]
pub struct AppContextBuilder {
    transport: Option<Arc<dyn HttpTransport>>,
    storage: Option<Arc<dyn KeyValueStore>>,
    root: Option<Arc<dyn ThemeRoot>>,
    base_url: Option<String>,
    system_theme: Theme,
}

impl AppContextBuilder {
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Element that receives the theme marker. Defaults to a fresh [`ClassList`].
    #[must_use]
    pub fn root(mut self, root: Arc<dyn ThemeRoot>) -> Self {
        self.root = Some(root);
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_owned());
        self
    }

    #[must_use]
    pub fn system_theme(mut self, theme: Theme) -> Self {
        self.system_theme = theme;
        self
    }

    /// Apply the theme, then restore the session from storage.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Missing`] naming the first absent collaborator.
    pub async fn build(self) -> Result<AppContext, ContextError> {
        let transport = self.transport.ok_or(ContextError::Missing("transport"))?;
        let storage = self.storage.ok_or(ContextError::Missing("storage"))?;
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ContextError::Missing("base URL"))?;
        let root = self.root.unwrap_or_else(|| Arc::new(ClassList::new()));

        let theme = ThemeStore::new(storage.clone(), root, self.system_theme);
        let session = SessionStore::restore(transport, storage, base_url).await;
        tracing::info!(status = ?session.status().await, theme = %theme.theme(), "app context ready");

        Ok(AppContext { session: Arc::new(session), theme: Arc::new(theme) })
    }
}
