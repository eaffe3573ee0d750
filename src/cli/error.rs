use crate::runtime::Outcome;
use thiserror::Error;

/// Error type for the yonky command-line shell
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Launcher(#[from] crate::core::error::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Script '{name}' did not complete successfully: {outcome:?}")]
    ScriptFailed { name: String, outcome: Outcome },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Async task error: {0}")]
    AsyncTask(#[from] tokio::task::JoinError),
}

impl CliError {
    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        use crate::core::error::Error as LauncherError;

        match self {
            Self::Launcher(LauncherError::ScriptNotFound(name)) => {
                format!("Script '{}' not found. Run 'yonky list' to see available scripts.", name)
            }
            Self::Launcher(LauncherError::ScriptExists(name)) => {
                format!("Script '{}' already exists. Pick another name or delete it first.", name)
            }
            Self::Launcher(LauncherError::InvalidScriptName(name)) => {
                format!(
                    "'{}' is not a valid script name. Use a plain file name without directories.",
                    name
                )
            }
            Self::Launcher(LauncherError::ScriptHostNotFound(host)) => {
                format!(
                    "Script host '{}' was not found. Install PowerShell or pass --script-host.",
                    host
                )
            }
            Self::Launcher(LauncherError::RunInProgress(name)) => {
                format!("'{}' is still running. Wait for it to finish first.", name)
            }
            Self::ScriptFailed { name, outcome } => match outcome {
                Outcome::Failed(code) => format!("Script '{}' exited with code {}.", name, code),
                Outcome::TimedOut => format!("Script '{}' timed out and was stopped.", name),
                Outcome::Terminated => format!("Script '{}' was terminated.", name),
                Outcome::LaunchFailed => format!("Script '{}' could not be started.", name),
                Outcome::Success => format!("Script '{}' completed.", name),
            },
            _ => self.to_string(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ScriptFailed { .. } => 2,
            Self::Cancelled(_) => 0,
            _ => 1,
        }
    }
}

/// Convenient result type for the shell
pub type Result<T> = std::result::Result<T, CliError>;

/// Trait for converting errors to user-friendly messages
pub trait UserFriendlyError {
    fn user_message(&self) -> String;
}

impl UserFriendlyError for CliError {
    fn user_message(&self) -> String {
        self.user_message()
    }
}
