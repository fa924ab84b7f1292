//! Light/dark display preference.
//!
//! Reads the stored preference (falling back to the platform preference),
//! applies the `dark` class to the document root, and writes every change
//! back to durable storage.
//!
//! TRADE-OFFS
//! ==========
//! Persistence and root updates are best-effort: a storage failure is
//! logged and the in-memory preference still changes, so the display
//! never disagrees with what the user just picked.

#[cfg(test)]
#[path = "theme_test.rs"]
mod theme_test;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::storage::{KeyValueStore, THEME_KEY};

/// Class added to the document root while the dark theme is active.
pub const DARK_CLASS: &str = "dark";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Stored and displayed form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parse the stored form. Case and surrounding whitespace are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DOCUMENT ROOT
// =============================================================================

/// The element styling reacts to. Mutations cannot fail.
pub trait ThemeRoot: Send + Sync {
    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);
}

/// In-memory class list. Clones share the same set.
#[derive(Clone, Debug, Default)]
pub struct ClassList {
    classes: Arc<Mutex<BTreeSet<String>>>,
}

impl ClassList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(class)
    }

    /// Classes in sorted order.
    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        self.classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl ThemeRoot for ClassList {
    fn add_class(&self, class: &str) {
        self.classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(class.to_owned());
    }

    fn remove_class(&self, class: &str) {
        self.classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(class);
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct ThemeStore {
    storage: Arc<dyn KeyValueStore>,
    root: Arc<dyn ThemeRoot>,
    theme: Mutex<Theme>,
}

impl ThemeStore {
    /// Load the preference and apply it to `root` immediately.
    ///
    /// `system_default` is the platform preference, used only when
    /// nothing valid is stored.
    pub fn new(storage: Arc<dyn KeyValueStore>, root: Arc<dyn ThemeRoot>, system_default: Theme) -> Self {
        let theme = read_preference(storage.as_ref(), system_default);
        let store = Self { storage, root, theme: Mutex::new(theme) };
        store.apply(theme);
        store
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        *self.theme.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.theme() == Theme::Dark
    }

    /// Flip between light and dark. Returns the new theme.
    pub fn toggle_theme(&self) -> Theme {
        let mut current = self.theme.lock().unwrap_or_else(PoisonError::into_inner);
        *current = current.toggled();
        self.apply(*current);
        *current
    }

    pub fn set_light_theme(&self) {
        self.set_theme(Theme::Light);
    }

    pub fn set_dark_theme(&self) {
        self.set_theme(Theme::Dark);
    }

    fn set_theme(&self, theme: Theme) {
        let mut current = self.theme.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == theme {
            return;
        }
        *current = theme;
        self.apply(theme);
    }

    /// Push `theme` to the root and storage. Mutators call this with the
    /// `theme` lock held so concurrent changes reach both in the order they
    /// were made.
    fn apply(&self, theme: Theme) {
        match theme {
            Theme::Dark => self.root.add_class(DARK_CLASS),
            Theme::Light => self.root.remove_class(DARK_CLASS),
        }
        if let Err(e) = self.storage.set(THEME_KEY, theme.as_str()) {
            tracing::warn!(error = %e, %theme, "theme preference not persisted");
        }
        tracing::debug!(%theme, "theme applied");
    }
}

fn read_preference(storage: &dyn KeyValueStore, system_default: Theme) -> Theme {
    match storage.get(THEME_KEY) {
        Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(stored = %raw, "ignoring unrecognized stored theme");
            system_default
        }),
        Ok(None) => system_default,
        Err(e) => {
            tracing::warn!(error = %e, "theme preference unreadable");
            system_default
        }
    }
}
