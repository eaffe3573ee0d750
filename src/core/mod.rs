//! Script catalog, preferences and the log hand-off shared by every front end

pub mod catalog;
pub mod error;
pub mod log;
pub mod preferences;

pub use catalog::{validate_name, ScriptCatalog, ScriptEntry, ScriptKind};
pub use error::{Error, Result};
pub use log::{LogEvent, LogLine, LogReceiver, LogSink, LogView, Severity, StatusChange};
pub use preferences::{PreferenceStore, Preferences, PreferencesEdit};
