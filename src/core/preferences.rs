//! User preferences persisted as a small JSON document
//!
//! The file lives beside the executable and holds four keys. Missing keys fall
//! back to built-in defaults, and an unreadable file behaves like a missing
//! one. Writes are best-effort.

use crate::core::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maximum number of entries kept in the recent scripts list
pub const MAX_RECENT_SCRIPTS: usize = 10;

/// Default value handed to the script host's `-ExecutionPolicy` switch
pub const DEFAULT_EXECUTION_POLICY: &str = "Bypass";

/// Persisted user preferences
///
/// Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Most recently run scripts, newest first
    pub recent_scripts: Vec<String>,

    /// Keep the log view pinned to its newest line
    pub auto_scroll: bool,

    /// Prefix each log line with a wall-clock stamp
    pub show_timestamps: bool,

    /// Execution policy passed to the PowerShell host
    pub execution_policy: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            recent_scripts: Vec::new(),
            auto_scroll: true,
            show_timestamps: true,
            execution_policy: DEFAULT_EXECUTION_POLICY.to_string(),
        }
    }
}

/// A set of changes produced by the preferences editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesEdit {
    pub auto_scroll: Option<bool>,
    pub show_timestamps: Option<bool>,
    pub execution_policy: Option<String>,
}

impl PreferencesEdit {
    pub fn is_empty(&self) -> bool {
        self.auto_scroll.is_none()
            && self.show_timestamps.is_none()
            && self.execution_policy.is_none()
    }
}

impl Preferences {
    /// Return a new value with the edit applied
    pub fn apply(&self, edit: PreferencesEdit) -> Self {
        let mut next = self.clone();
        if let Some(auto_scroll) = edit.auto_scroll {
            next.auto_scroll = auto_scroll;
        }
        if let Some(show_timestamps) = edit.show_timestamps {
            next.show_timestamps = show_timestamps;
        }
        if let Some(policy) = edit.execution_policy {
            let policy = policy.trim();
            next.execution_policy = if policy.is_empty() {
                DEFAULT_EXECUTION_POLICY.to_string()
            } else {
                policy.to_string()
            };
        }
        next
    }

    /// Move `name` to the front of the recent list
    pub fn record_recent(&mut self, name: &str) {
        self.recent_scripts.retain(|existing| existing != name);
        self.recent_scripts.insert(0, name.to_string());
        self.recent_scripts.truncate(MAX_RECENT_SCRIPTS);
    }

    /// Overlay the known keys of `map` on the defaults, one key at a time
    fn merged(map: &Map<String, Value>) -> Self {
        let mut prefs = Self::default();
        merge_key(map, "recent_scripts", &mut prefs.recent_scripts);
        merge_key(map, "auto_scroll", &mut prefs.auto_scroll);
        merge_key(map, "show_timestamps", &mut prefs.show_timestamps);
        merge_key(map, "execution_policy", &mut prefs.execution_policy);
        prefs
    }

    /// Drop `name` from the recent list, e.g. after the script was deleted
    pub fn forget_recent(&mut self, name: &str) {
        self.recent_scripts.retain(|existing| existing != name);
    }
}

fn merge_key<T: DeserializeOwned>(map: &Map<String, Value>, key: &str, slot: &mut T) {
    let Some(value) = map.get(key) else {
        return;
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(e) => warn!(key, error = %e, "Ignoring preference with unexpected value"),
    }
}

/// Reads and writes [`Preferences`] at a fixed path
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, never failing
    ///
    /// Each known key present in the file wins over its default. A key with a
    /// value of the wrong type keeps its default. A missing file, or one that
    /// is not a JSON object, yields pure defaults.
    pub fn load(&self) -> Preferences {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No preferences file, using defaults");
                return Preferences::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read preferences");
                return Preferences::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Preferences::merged(&map),
            Ok(_) => {
                warn!(path = %self.path.display(), "Preferences file is not a JSON object");
                Preferences::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not parse preferences");
                Preferences::default()
            }
        }
    }

    /// Write preferences, logging rather than returning any failure
    pub fn save(&self, prefs: &Preferences) {
        if let Err(e) = self.try_save(prefs) {
            warn!(path = %self.path.display(), error = %e, "Could not save preferences");
        }
    }

    /// Write preferences as pretty-printed JSON
    pub fn try_save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut content = serde_json::to_string_pretty(prefs)?;
        content.push('\n');
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}
