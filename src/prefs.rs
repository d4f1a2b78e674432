//! Durable user preferences.
//!
//! Only two values are persisted: the colour theme and the chat pane width.
//! Storage is best-effort everywhere; a failed read falls back to the default
//! and a failed write is logged and otherwise ignored.
//!
//! # Example
//!
//! ```rust
//! use web_tester::prefs::{MemoryPrefs, PreferenceStore, Theme, THEME_KEY, get_pref, parse_theme};
//!
//! let store = MemoryPrefs::new();
//! store.set(THEME_KEY, "light").unwrap();
//! assert_eq!(get_pref(&store, THEME_KEY, parse_theme, Theme::Dark), Theme::Light);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Storage key for the colour theme.
pub const THEME_KEY: &str = "web-tester-theme";

/// Storage key for the chat pane fraction.
pub const CHAT_WIDTH_KEY: &str = "web-tester-chat-width";

/// Errors raised by a preference backend.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    /// Reading or writing the backing file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("Corrupt preference file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable string key-value storage.
///
/// Implementations are injected into the components that persist state;
/// nothing reads preferences from ambient globals.
pub trait PreferenceStore: Send + Sync + fmt::Debug {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError>;

    /// Write `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError>;
}

/// Read `key`, run it through `validate`, and fall back to `default` when the
/// value is absent, unreadable or rejected.
pub fn get_pref<T, S, F>(store: &S, key: &str, validate: F, default: T) -> T
where
    S: PreferenceStore + ?Sized,
    F: FnOnce(&str) -> Option<T>,
{
    match store.get(key) {
        Ok(Some(raw)) => validate(&raw).unwrap_or(default),
        Ok(None) => default,
        Err(e) => {
            tracing::debug!(key, error = %e, "Preference read failed, using default");
            default
        }
    }
}

/// Write `value` under `key`, swallowing storage failures.
pub fn set_pref<S>(store: &S, key: &str, value: impl fmt::Display)
where
    S: PreferenceStore + ?Sized,
{
    let value = value.to_string();
    if let Err(e) = store.set(key, &value) {
        tracing::debug!(key, error = %e, "Preference write failed, ignoring");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Theme
// ─────────────────────────────────────────────────────────────────────────────

/// Colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    Light,
    /// Dark background.
    #[default]
    Dark,
}

impl Theme {
    /// Stored and rendered name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The other theme.
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

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(()),
        }
    }
}

/// Validator for [`THEME_KEY`].
pub fn parse_theme(raw: &str) -> Option<Theme> {
    raw.parse().ok()
}

/// Stored theme if any, else the system preference, else dark.
pub fn resolve_theme<S>(store: &S, system: Option<Theme>) -> Theme
where
    S: PreferenceStore + ?Sized,
{
    let fallback = system.unwrap_or_default();
    get_pref(store, THEME_KEY, parse_theme, fallback)
}

// ─────────────────────────────────────────────────────────────────────────────
// Backends
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store, used by tests and as a fallback when no file is set.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPrefs {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPrefs {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        let guard = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut guard = self.values.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk.
///
/// Every write rewrites the whole file; the value set is two keys.
#[derive(Debug)]
pub struct FilePrefs {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePrefs {
    /// Use the file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, PrefsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl PreferenceStore for FilePrefs {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking every future write.
        let mut values = self.read_all().unwrap_or_default();
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BrokenPrefs;

    impl PreferenceStore for BrokenPrefs {
        fn get(&self, _key: &str) -> Result<Option<String>, PrefsError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), PrefsError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    #[test]
    fn test_get_pref_falls_back_on_absence_and_rejection() {
        let store = MemoryPrefs::new();
        assert_eq!(get_pref(&store, THEME_KEY, parse_theme, Theme::Light), Theme::Light);

        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(get_pref(&store, THEME_KEY, parse_theme, Theme::Light), Theme::Light);

        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(get_pref(&store, THEME_KEY, parse_theme, Theme::Light), Theme::Dark);
    }

    #[test]
    fn test_storage_errors_are_silent() {
        let store = BrokenPrefs;
        assert_eq!(get_pref(&store, THEME_KEY, parse_theme, Theme::Dark), Theme::Dark);
        set_pref(&store, THEME_KEY, Theme::Light);
    }

    #[test]
    fn test_resolve_theme_order() {
        let store = MemoryPrefs::new();
        assert_eq!(resolve_theme(&store, None), Theme::Dark);
        assert_eq!(resolve_theme(&store, Some(Theme::Light)), Theme::Light);

        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(resolve_theme(&store, Some(Theme::Light)), Theme::Dark);
    }

    #[test]
    fn test_theme_toggle_and_names() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled().as_str(), "dark");
        assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
        assert!("Light".parse::<Theme>().is_err());
    }
}
