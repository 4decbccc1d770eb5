//! Durable local state
//!
//! Saves and loads the logged-in user name to a JSON file in the
//! application config directory, so the identity survives restarts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Persisted preferences
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Preferences {
    /// Name of the logged-in user (None = logged out)
    pub user_name: Option<String>,
}

/// Get the default preferences file path
pub(crate) fn default_preferences_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Followup").join("preferences.json"))
}

/// Preferences file at a fixed location
#[derive(Debug, Clone)]
pub(crate) struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config directory
    pub fn open_default() -> Result<Self, PreferencesError> {
        default_preferences_path()
            .map(Self::new)
            .ok_or(PreferencesError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences from disk
    ///
    /// Returns default preferences if the file doesn't exist or can't be read
    pub fn load(&self) -> Preferences {
        if !self.path.exists() {
            return Preferences::default();
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(prefs) => prefs,
                Err(e) => {
                    error!("Failed to parse preferences: {}", e);
                    Preferences::default()
                }
            },
            Err(e) => {
                error!("Failed to read preferences file: {}", e);
                Preferences::default()
            }
        }
    }

    /// Save preferences to disk
    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created preferences directory: {:?}", parent);
            }
        }

        let json = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, json)?;
        info!("Saved preferences to: {:?}", self.path);

        Ok(())
    }

    /// Get the stored user name, if any
    pub fn user_name(&self) -> Option<String> {
        self.load().user_name.filter(|u| !u.is_empty())
    }

    /// Set or clear the stored user name
    pub fn set_user_name(&self, user_name: Option<&str>) -> Result<(), PreferencesError> {
        let mut prefs = self.load();
        prefs.user_name = user_name.map(str::to_string);
        self.save(&prefs)
    }
}

/// Preferences errors
#[derive(Debug, thiserror::Error)]
pub(crate) enum PreferencesError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, PreferencesStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("nested").join("preferences.json"));
        (dir, store)
    }

    #[test]
    fn test_default_preferences() {
        let prefs = Preferences::default();
        assert!(prefs.user_name.is_none());
    }

    #[test]
    fn test_default_preferences_path() {
        let path = default_preferences_path();
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("Followup/preferences.json"));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load(), Preferences::default());
        assert!(store.user_name().is_none());
    }

    #[test]
    fn test_user_name_round_trip() {
        let (_dir, store) = temp_store();
        store.set_user_name(Some("admin")).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.user_name().as_deref(), Some("admin"));

        store.set_user_name(None).unwrap();
        assert!(store.user_name().is_none());
    }

    #[test]
    fn test_corrupt_file_loads_defaults() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), Preferences::default());
    }
}
