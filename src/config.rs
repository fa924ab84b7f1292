//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

use crate::state::theme::Theme;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const STATE_DIR_NAME: &str = ".notes-client";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API root; relative endpoints are appended to it.
    pub api_base_url: String,
    /// Directory holding the durable key-value file.
    pub state_dir: PathBuf,
    pub timeouts: Timeouts,
    /// Platform display preference used when no theme has been stored.
    pub system_theme: Theme,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `NOTES_API_BASE_URL`: default `http://localhost:5000/api`
    /// - `NOTES_STATE_DIR`: default `$HOME/.notes-client`
    /// - `NOTES_REQUEST_TIMEOUT_SECS`: default 30
    /// - `NOTES_CONNECT_TIMEOUT_SECS`: default 10
    /// - `NOTES_SYSTEM_THEME`: `light` (default) or `dark`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for an unrecognized `NOTES_SYSTEM_THEME`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = normalize_base_url(
            &std::env::var("NOTES_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned()),
        );
        let state_dir = std::env::var("NOTES_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_dir());
        let timeouts = Timeouts {
            request_secs: env_parse_u64("NOTES_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("NOTES_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let system_theme = parse_system_theme(std::env::var("NOTES_SYSTEM_THEME").ok().as_deref())?;

        Ok(Self { api_base_url, state_dir, timeouts, system_theme })
    }

    /// Same config pointed at another backend.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_base_url = normalize_base_url(base_url);
        self
    }

    /// Path of the durable key-value file inside `state_dir`.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.state_dir.join("storage.json")
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from(STATE_DIR_NAME), |home| PathBuf::from(home).join(STATE_DIR_NAME))
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_system_theme(raw: Option<&str>) -> Result<Theme, ConfigError> {
    let raw = raw.unwrap_or("light");
    Theme::parse(raw).ok_or_else(|| ConfigError::Parse(format!("unknown NOTES_SYSTEM_THEME: {raw}")))
}
