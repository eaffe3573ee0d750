//! Command-line shell for the script launcher
//! ## Usage
//!
//! ```bash
//! # List available scripts
//! yonky list
//!
//! # Run a script and stream its output
//! yonky run backup.ps1
//!
//! # Create a new script and open it in the editor
//! yonky new cleanup
//!
//! # Turn off timestamps in the output
//! yonky prefs set --show-timestamps false
//! ```

pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

#[cfg(test)]
mod error_test;

// Re-export commonly used types
pub use app::{Cli, Commands, Launcher};
pub use error::{CliError, Result, UserFriendlyError};

/// Version information for the shell
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
