use thiserror::Error;

/// Errors produced by the script catalog, preference store and runner
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Script already exists: {0}")]
    ScriptExists(String),

    #[error("Invalid script name: {0:?}")]
    InvalidScriptName(String),

    #[error("Unsupported script type: {0}")]
    UnsupportedScriptType(String),

    #[error("Script host '{0}' was not found on PATH")]
    ScriptHostNotFound(String),

    #[error("Failed to launch '{name}': {reason}")]
    Launch { name: String, reason: String },

    #[error("A run is already in progress: {0}")]
    RunInProgress(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a launch error for the named script
    pub fn launch<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::Launch {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
