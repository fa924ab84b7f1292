use super::*;
use crate::net::transport::Method;
use crate::state::session::SessionStatus;
use crate::state::theme::DARK_CLASS;
use crate::storage::{MemoryStore, THEME_KEY, TOKEN_KEY};
use crate::test_helpers::{BASE_URL, MockTransport};
use serde_json::json;

#[tokio::test]
async fn build_without_transport_fails_before_any_request() {
    let err = AppContext::builder()
        .storage(Arc::new(MemoryStore::new()))
        .base_url(BASE_URL)
        .build()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ContextError::Missing("transport")));
}

#[tokio::test]
async fn build_without_storage_fails() {
    let transport = Arc::new(MockTransport::new());
    let err = AppContext::builder()
        .transport(transport.clone())
        .base_url(BASE_URL)
        .build()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ContextError::Missing("storage")));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn build_without_base_url_fails() {
    let err = AppContext::builder()
        .transport(Arc::new(MockTransport::new()))
        .storage(Arc::new(MemoryStore::new()))
        .base_url("  ")
        .build()
        .await
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "app context is missing its base URL");
}

#[tokio::test]
async fn build_restores_session_and_applies_theme() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::GET, "/auth/me", 200, json!({ "user": { "id": 7, "name": "Ana" } }));
    let storage = Arc::new(MemoryStore::new());
    storage.set(TOKEN_KEY, "tok").unwrap();
    storage.set(THEME_KEY, "dark").unwrap();
    let root = ClassList::new();

    let ctx = AppContext::builder()
        .transport(transport)
        .storage(storage)
        .root(Arc::new(root.clone()))
        .base_url(BASE_URL)
        .build()
        .await
        .unwrap();

    assert_eq!(ctx.session.status().await, SessionStatus::Authenticated);
    assert!(ctx.theme.is_dark());
    assert!(root.contains(DARK_CLASS));
}

#[tokio::test]
async fn clones_share_stores() {
    let ctx = AppContext::builder()
        .transport(Arc::new(MockTransport::new()))
        .storage(Arc::new(MemoryStore::new()))
        .base_url(BASE_URL)
        .system_theme(Theme::Light)
        .build()
        .await
        .unwrap();
    let other = ctx.clone();

    ctx.theme.toggle_theme();
    assert!(other.theme.is_dark());
    assert!(Arc::ptr_eq(&ctx.session, &other.session));
}

#[tokio::test]
async fn from_config_uses_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        api_base_url: "http://127.0.0.1:9/api".to_owned(),
        state_dir: dir.path().join("state"),
        timeouts: crate::config::Timeouts::default(),
        system_theme: Theme::Dark,
    };

    let ctx = AppContext::from_config(&config).await.unwrap();

    assert_eq!(ctx.session.status().await, SessionStatus::Anonymous);
    assert!(ctx.theme.is_dark());
    let saved = std::fs::read_to_string(config.storage_path()).unwrap();
    assert!(saved.contains("\"theme\": \"dark\""));
}
