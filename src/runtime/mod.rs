//! Script execution engine
//!
//! This module handles:
//! - Building the platform command line for a script
//! - Spawning it with separately captured stdout/stderr
//! - Streaming output lines to a log sink as they arrive
//! - Enforcing the run timeout and reporting the outcome

pub mod process;
pub mod runner;


pub use process::{default_script_host, run_console, Invocation};
pub use runner::{ExecutionResult, Outcome, RunnerConfig, ScriptRunner, DEFAULT_TIMEOUT};
