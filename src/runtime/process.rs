//! Building and tearing down script processes

use crate::core::catalog::ScriptKind;
use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Interpreter used for `.ps1` scripts on this platform
pub fn default_script_host() -> &'static str {
    if cfg!(windows) {
        "powershell"
    } else {
        "pwsh"
    }
}

/// Program and arguments for one script invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// Work out how to launch `path`
    ///
    /// PowerShell scripts go through `script_host` with an explicit
    /// `-ExecutionPolicy`; batch files are executed as the command itself.
    pub fn for_script(
        name: &str,
        path: &Path,
        script_host: &str,
        execution_policy: &str,
    ) -> Result<Self> {
        match ScriptKind::from_name(name) {
            Some(ScriptKind::PowerShell) => {
                let program = which::which(script_host)
                    .map_err(|_| Error::ScriptHostNotFound(script_host.to_string()))?;
                Ok(Self {
                    program,
                    args: vec![
                        "-ExecutionPolicy".to_string(),
                        execution_policy.to_string(),
                        "-File".to_string(),
                        path.to_string_lossy().into_owned(),
                    ],
                })
            }
            Some(ScriptKind::Batch) => Ok(Self {
                program: path.to_path_buf(),
                args: Vec::new(),
            }),
            None => Err(Error::UnsupportedScriptType(name.to_string())),
        }
    }

    /// An interactive session of `script_host` with no script
    pub fn console(script_host: &str) -> Result<Self> {
        let program = which::which(script_host)
            .map_err(|_| Error::ScriptHostNotFound(script_host.to_string()))?;
        Ok(Self {
            program,
            args: vec!["-NoLogo".to_string()],
        })
    }

    /// A command with both output streams piped and stdin closed
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Lead a fresh process group so a kill reaches everything the script started
        #[cfg(unix)]
        command.process_group(0);

        command
    }
}

/// Hand the terminal to an interactive script host until it exits
///
/// The session starts in `dir` and shares this process's stdio.
pub async fn run_console(invocation: &Invocation, dir: &Path) -> Result<ExitStatus> {
    let program = invocation.program.display().to_string();
    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::launch(&program, e.to_string()))?;

    info!(program = %program, pid = ?child.id(), "Opened script host console");
    let status = child.wait().await?;
    debug!(?status, "Script host console closed");
    Ok(status)
}

/// Forcibly stop a child and reap it
pub async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        kill_process_group(pid);
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill script process");
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers; a negative pid addresses the group
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "Could not signal process group"
        );
    }
}
