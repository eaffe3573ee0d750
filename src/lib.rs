//! # yonky
//!
//! List local PowerShell and batch scripts, run them with live output capture,
//! and keep a few preferences between sessions.
//!
//! The library is split into:
//! - [`core`]: the script catalog, preference store and the log hand-off
//! - [`runtime`]: spawning scripts, draining their output and enforcing the timeout
//! - `cli` (feature `cli`): the `yonky` command-line shell
//!
//! ```rust,no_run
//! use yonky::core::{log, ScriptCatalog};
//! use yonky::runtime::{RunnerConfig, ScriptRunner};
//!
//! # #[tokio::main]
//! # async fn main() -> yonky::core::Result<()> {
//! let catalog = ScriptCatalog::new("scripts");
//! let runner = ScriptRunner::new(catalog, RunnerConfig::default());
//!
//! let (sink, mut rx) = log::channel();
//! let handle = runner.spawn("backup.ps1", sink)?;
//! while let Some(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! let result = handle.await.expect("run task panicked");
//! println!("outcome: {:?}", result.outcome());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod runtime;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::core::{Error, Result};
pub use crate::runtime::{ExecutionResult, Outcome, ScriptRunner};
