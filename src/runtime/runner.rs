//! Script execution with live output capture
//!
//! A run resolves the script, spawns it with both output streams piped, and
//! forwards every line to a [`LogSink`] as it arrives. It waits for exit under
//! a timeout and finishes with a short summary. The summary is only written
//! once both stream readers have drained, so a log always shows the complete
//! output before the outcome.

use crate::core::catalog::ScriptCatalog;
use crate::core::error::{Error, Result};
use crate::core::log::{LogSink, Severity};
use crate::core::preferences::DEFAULT_EXECUTION_POLICY;
use crate::runtime::process::{default_script_host, terminate, Invocation};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Wall-clock limit for a single run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings for [`ScriptRunner`]
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Kill the script once it has run this long
    pub timeout: Duration,
    /// Interpreter for `.ps1` scripts, looked up on `PATH`
    pub script_host: String,
    /// Value for the host's `-ExecutionPolicy` switch
    pub execution_policy: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            script_host: default_script_host().to_string(),
            execution_policy: DEFAULT_EXECUTION_POLICY.to_string(),
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(i32),
    /// Ended by a signal that the runner did not send
    Terminated,
    TimedOut,
    LaunchFailed,
}

/// Structured result of one run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Exit code; absent when the process was killed
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_secs: f64,
    /// Set when the script never got to run
    pub launch_error: Option<String>,
    /// Signal that ended the process, when it did not exit normally
    pub signal: Option<i32>,
}

impl ExecutionResult {
    fn launch_failed(message: String, duration: Duration) -> Self {
        Self {
            exit_code: None,
            timed_out: false,
            duration_secs: duration.as_secs_f64(),
            launch_error: Some(message),
            signal: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.launch_error.is_some() {
            Outcome::LaunchFailed
        } else if self.timed_out {
            Outcome::TimedOut
        } else {
            match self.exit_code {
                Some(0) => Outcome::Success,
                Some(code) => Outcome::Failed(code),
                None => Outcome::Terminated,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == Outcome::Success
    }
}

/// Which output stream a reader drains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn header(self) -> (&'static str, Severity) {
        match self {
            Self::Stdout => ("STDOUT:", Severity::Info),
            Self::Stderr => ("STDERR:", Severity::Error),
        }
    }

    fn line_severity(self) -> Severity {
        match self {
            Self::Stdout => Severity::Plain,
            Self::Stderr => Severity::Error,
        }
    }
}

/// Holds the single in-flight slot until dropped
struct RunGuard {
    slot: Arc<Mutex<Option<String>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

/// Runs catalog scripts one at a time
///
/// Clones share the in-flight slot, so a second run is refused while one is
/// active no matter which clone started it.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    catalog: ScriptCatalog,
    config: Arc<RunnerConfig>,
    active: Arc<Mutex<Option<String>>>,
}

impl ScriptRunner {
    pub fn new(catalog: ScriptCatalog, config: RunnerConfig) -> Self {
        Self {
            catalog,
            config: Arc::new(config),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Name of the script currently running, if any
    pub fn active_script(&self) -> Option<String> {
        self.active.lock().clone()
    }

    fn acquire(&self, name: &str) -> Result<RunGuard> {
        let mut slot = self.active.lock();
        if let Some(current) = slot.as_ref() {
            return Err(Error::RunInProgress(current.clone()));
        }
        *slot = Some(name.to_string());
        Ok(RunGuard {
            slot: Arc::clone(&self.active),
        })
    }

    /// Start a run on a background task and return immediately
    ///
    /// The only error is [`Error::RunInProgress`]; everything that happens
    /// during the run is reported through the sink and the result.
    pub fn spawn(&self, name: &str, sink: LogSink) -> Result<JoinHandle<ExecutionResult>> {
        let guard = self.acquire(name)?;
        let runner = self.clone();
        let name = name.to_string();
        Ok(tokio::spawn(async move {
            let _guard = guard;
            runner.execute(&name, &sink).await
        }))
    }

    /// Run a script to completion on the current task
    pub async fn run(&self, name: &str, sink: LogSink) -> Result<ExecutionResult> {
        let _guard = self.acquire(name)?;
        Ok(self.execute(name, &sink).await)
    }

    #[instrument(name = "script_run", skip(self, sink))]
    async fn execute(&self, name: &str, sink: &LogSink) -> ExecutionResult {
        sink.set_busy(true, format!("Running: {name}"));
        sink.info(format!("Starting execution: {name}"));

        let started = Instant::now();
        let result = match self.supervise(name, sink).await {
            Ok(result) => {
                report(name, &result, self.config.timeout, sink);
                result
            }
            Err(e) => {
                error!(error = %e, "Script run failed before completion");
                sink.error(format!("Exception running '{name}': {e}"));
                ExecutionResult::launch_failed(e.to_string(), started.elapsed())
            }
        };

        info!(
            outcome = ?result.outcome(),
            duration_secs = result.duration_secs,
            "Script run finished"
        );
        sink.set_busy(false, "Ready");
        result
    }

    async fn supervise(&self, name: &str, sink: &LogSink) -> Result<ExecutionResult> {
        let path = self.catalog.resolve_path(name)?;
        let invocation = Invocation::for_script(
            name,
            &path,
            &self.config.script_host,
            &self.config.execution_policy,
        )?;
        debug!(program = %invocation.program.display(), args = ?invocation.args, "Launching script");

        let started = Instant::now();
        let mut child = invocation
            .command()
            .spawn()
            .map_err(|e| Error::launch(name, e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::launch(name, "stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::launch(name, "stderr was not captured"))?;

        let readers = [
            tokio::spawn(drain_stream(stdout, StreamKind::Stdout, sink.clone())),
            tokio::spawn(drain_stream(stderr, StreamKind::Stderr, sink.clone())),
        ];

        let waited = tokio::time::timeout(self.config.timeout, child.wait()).await;
        let (status, timed_out) = match waited {
            Ok(Ok(status)) => (Some(status), false),
            Ok(Err(e)) => {
                terminate(&mut child).await;
                join_readers(readers).await;
                return Err(e.into());
            }
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "Script timed out, killing it");
                terminate(&mut child).await;
                (None, true)
            }
        };
        let duration = started.elapsed();

        join_readers(readers).await;

        Ok(ExecutionResult {
            exit_code: status.and_then(|s| s.code()),
            timed_out,
            duration_secs: duration.as_secs_f64(),
            launch_error: None,
            signal: status.and_then(exit_signal),
        })
    }
}

#[cfg(unix)]
fn exit_signal(status: std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: std::process::ExitStatus) -> Option<i32> {
    None
}

async fn join_readers(readers: [JoinHandle<std::io::Result<usize>>; 2]) {
    for reader in readers {
        match reader.await {
            Ok(Ok(lines)) => debug!(lines, "Stream reader finished"),
            Ok(Err(e)) => warn!(error = %e, "Stream reader stopped early"),
            Err(e) => warn!(error = %e, "Stream reader task failed"),
        }
    }
}

/// Forward every line of `stream` to the sink, returning the line count
///
/// The header is written just before the first line, so an empty stream
/// leaves no trace in the log.
async fn drain_stream<R>(stream: R, kind: StreamKind, sink: LogSink) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        if count == 0 {
            let (header, severity) = kind.header();
            sink.append(header, severity);
        }
        sink.append(decode_line(&buf), kind.line_severity());
        count += 1;
    }

    Ok(count)
}

/// Lossily decode one raw line and strip its terminator
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Emit the separator, duration and outcome lines
fn report(name: &str, result: &ExecutionResult, timeout: Duration, sink: &LogSink) {
    sink.info(format!("=== Executed: {name} ==="));
    sink.info(format!("Duration: {:.2} seconds", result.duration_secs));

    match result.outcome() {
        Outcome::TimedOut => sink.error(format!(
            "Script '{name}' timed out after {}",
            describe_timeout(timeout)
        )),
        Outcome::Failed(code) => sink.error(format!("Exit code: {code}")),
        Outcome::Terminated => match result.signal {
            Some(signal) => sink.error(format!("Script '{name}' was terminated by signal {signal}")),
            None => sink.error(format!("Script '{name}' ended without an exit code")),
        },
        Outcome::Success => sink.success("Script completed successfully"),
        // Launch failures never reach the summary
        Outcome::LaunchFailed => {}
    }
}

/// Human wording for a timeout, e.g. `5 minutes` or `1 second`
fn describe_timeout(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    let (value, unit) = if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"  padded  \n"), "  padded  ");
        assert_eq!(decode_line(b"bad \xff byte\n"), "bad \u{fffd} byte");
    }

    #[test]
    fn test_describe_timeout() {
        assert_eq!(describe_timeout(DEFAULT_TIMEOUT), "5 minutes");
        assert_eq!(describe_timeout(Duration::from_secs(60)), "1 minute");
        assert_eq!(describe_timeout(Duration::from_secs(1)), "1 second");
        assert_eq!(describe_timeout(Duration::from_secs(90)), "90 seconds");
    }

    #[test]
    fn test_outcome_classification() {
        let base = ExecutionResult {
            exit_code: Some(0),
            timed_out: false,
            duration_secs: 0.5,
            launch_error: None,
            signal: None,
        };
        assert_eq!(base.outcome(), Outcome::Success);
        assert!(base.is_success());

        let failed = ExecutionResult {
            exit_code: Some(3),
            ..base.clone()
        };
        assert_eq!(failed.outcome(), Outcome::Failed(3));

        let timed_out = ExecutionResult {
            exit_code: None,
            timed_out: true,
            ..base.clone()
        };
        assert_eq!(timed_out.outcome(), Outcome::TimedOut);

        let killed = ExecutionResult {
            exit_code: None,
            signal: Some(9),
            ..base.clone()
        };
        assert_eq!(killed.outcome(), Outcome::Terminated);

        let launch = ExecutionResult::launch_failed("nope".into(), Duration::ZERO);
        assert_eq!(launch.outcome(), Outcome::LaunchFailed);
        assert!(!launch.is_success());
    }

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.execution_policy, "Bypass");
        assert_eq!(config.script_host, default_script_host());
    }
}
