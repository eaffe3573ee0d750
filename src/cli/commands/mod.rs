//! Subcommand implementations
//!
//! Each command borrows the [`Launcher`] controller, performs one catalog,
//! runner or preference operation, and reports through a [`Console`].

use crate::cli::app::Launcher;
use crate::cli::error::{CliError, Result};
use crate::cli::output::{script_table, Console};
use crate::core::log::{self, Severity};
use crate::core::preferences::{Preferences, PreferencesEdit};
use crate::runtime::{default_script_host, run_console, Invocation, RunnerConfig, ScriptRunner};
use clap::{Args, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;


/// List the scripts in the catalog
#[derive(Args, Debug, Clone)]
pub struct ListCommand {
    /// Print only script names, one per line
    #[arg(long)]
    pub names_only: bool,
}

impl ListCommand {
    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        let entries = launcher.catalog.list()?;

        if self.names_only {
            for entry in &entries {
                println!("{}", entry.name);
            }
            return Ok(());
        }

        if entries.is_empty() {
            println!(
                "No scripts found in {}",
                launcher.catalog.dir().display()
            );
        } else {
            script_table(&entries).printstd();
        }
        if !launcher.quiet {
            eprintln!("{} scripts loaded", entries.len());
        }
        Ok(())
    }
}

/// Run a script and stream its output
#[derive(Args, Debug, Clone)]
pub struct RunCommand {
    /// Script file name as shown by `list`
    pub name: String,

    /// Kill the script after this many seconds
    #[arg(long, default_value_t = crate::runtime::DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Interpreter for .ps1 scripts
    #[arg(long)]
    pub script_host: Option<String>,

    /// Clear the terminal before the run starts
    #[arg(long)]
    pub clear: bool,

    /// Also write the run's output, without colours, to this file
    #[arg(long, value_name = "FILE")]
    pub save_output: Option<PathBuf>,
}

impl RunCommand {
    pub fn runner_config(&self, prefs: &Preferences) -> RunnerConfig {
        RunnerConfig {
            timeout: Duration::from_secs(self.timeout),
            script_host: self
                .script_host
                .clone()
                .unwrap_or_else(|| default_script_host().to_string()),
            execution_policy: prefs.execution_policy.clone(),
        }
    }

    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        if self.timeout == 0 {
            return Err(CliError::invalid_input("--timeout must be at least 1 second"));
        }
        // Only listed scripts may be run
        launcher.catalog.entry(&self.name)?;

        let runner = ScriptRunner::new(
            launcher.catalog.clone(),
            self.runner_config(&launcher.prefs),
        );
        let (sink, rx) = log::channel();
        let handle = runner.spawn(&self.name, sink)?;

        let mut console = Console::stdout(&launcher.prefs, launcher.quiet);
        if self.clear {
            console.clear();
        }
        console.drain(rx).await;
        let result = handle.await?;

        if let Some(path) = &self.save_output {
            match console.save_transcript(path) {
                Ok(()) => info!(path = %path.display(), "Saved run output"),
                Err(e) => console.log(
                    format!("Could not save output to {}: {e}", path.display()),
                    Severity::Error,
                ),
            }
        }

        if result.launch_error.is_none() {
            launcher.prefs.record_recent(&self.name);
            launcher.store.save(&launcher.prefs);
        }

        if result.is_success() {
            Ok(())
        } else {
            Err(CliError::ScriptFailed {
                name: self.name,
                outcome: result.outcome(),
            })
        }
    }
}

/// Copy an existing script into the catalog
#[derive(Args, Debug, Clone)]
pub struct AddCommand {
    /// Path of the file to copy
    pub path: PathBuf,
}

impl AddCommand {
    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        let entry = launcher.catalog.add(&self.path)?;
        let mut console = Console::stdout(&launcher.prefs, launcher.quiet);
        console.log(format!("Added script: {}", entry.name), Severity::Success);
        Ok(())
    }
}

/// Create a new script from a template
#[derive(Args, Debug, Clone)]
pub struct NewCommand {
    /// Script name; `.ps1` is appended unless it ends in .ps1, .bat or .cmd
    pub name: String,

    /// Do not open the new script in the editor
    #[arg(long)]
    pub no_edit: bool,
}

impl NewCommand {
    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        let entry = launcher.catalog.create(&self.name)?;
        let mut console = Console::stdout(&launcher.prefs, launcher.quiet);
        console.log(format!("Created new script: {}", entry.name), Severity::Success);

        if !self.no_edit {
            if let Err(e) = launcher.catalog.edit(&entry.name) {
                console.log(format!("Could not open editor: {e}"), Severity::Error);
            }
        }
        Ok(())
    }
}

/// Delete a script
#[derive(Args, Debug, Clone)]
pub struct DeleteCommand {
    /// Script file name as shown by `list`
    pub name: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl DeleteCommand {
    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        launcher.catalog.entry(&self.name)?;

        if !self.yes {
            let prompt = format!("Are you sure you want to delete '{}'? [y/N] ", self.name);
            if !confirm(&prompt, &mut io::stdin().lock(), &mut io::stderr())? {
                return Err(CliError::cancelled(format!("'{}' was not deleted", self.name)));
            }
        }

        launcher.catalog.remove(&self.name)?;
        launcher.prefs.forget_recent(&self.name);

        let mut console = Console::stdout(&launcher.prefs, launcher.quiet);
        console.log(format!("Deleted script: {}", self.name), Severity::Success);
        Ok(())
    }
}

/// Ask a yes/no question, defaulting to no
pub fn confirm<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Open a script with the default editor
#[derive(Args, Debug, Clone)]
pub struct EditCommand {
    /// Script file name as shown by `list`
    pub name: String,
}

impl EditCommand {
    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        launcher.catalog.edit(&self.name)?;
        info!(name = %self.name, "Opened script in editor");
        Ok(())
    }
}

/// Start an interactive script host session in the scripts folder
#[derive(Args, Debug, Clone)]
pub struct ConsoleCommand {
    /// Interpreter to start instead of the platform default
    #[arg(long)]
    pub script_host: Option<String>,
}

impl ConsoleCommand {
    pub fn script_host(&self) -> &str {
        self.script_host
            .as_deref()
            .unwrap_or_else(|| default_script_host())
    }

    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        let invocation = Invocation::console(self.script_host())?;
        launcher.catalog.ensure_dir()?;

        let status = run_console(&invocation, launcher.catalog.dir()).await?;
        if !launcher.quiet {
            eprintln!("Console closed ({status})");
        }
        Ok(())
    }
}

/// Open the scripts folder in the file manager
pub async fn open_folder(launcher: &mut Launcher) -> Result<()> {
    launcher.catalog.open_folder()?;
    if !launcher.quiet {
        eprintln!("Opened {}", launcher.catalog.dir().display());
    }
    Ok(())
}

/// Print the recent scripts list, marking entries that no longer exist
pub async fn show_recent(launcher: &mut Launcher) -> Result<()> {
    if launcher.prefs.recent_scripts.is_empty() {
        println!("No scripts have been run yet");
        return Ok(());
    }

    for (index, name) in launcher.prefs.recent_scripts.iter().enumerate() {
        let missing = launcher.catalog.entry(name).is_err();
        if missing {
            println!("{:>2}. {} (missing)", index + 1, name);
        } else {
            println!("{:>2}. {}", index + 1, name);
        }
    }
    Ok(())
}

/// Preference actions
#[derive(Subcommand, Debug, Clone)]
pub enum PrefsAction {
    /// Print the current preferences as JSON
    Show,

    /// Change one or more preferences
    Set {
        /// Keep the output pinned to the newest line
        #[arg(long)]
        auto_scroll: Option<bool>,

        /// Prefix output lines with HH:MM:SS
        #[arg(long)]
        show_timestamps: Option<bool>,

        /// Execution policy passed to PowerShell
        #[arg(long)]
        execution_policy: Option<String>,
    },

    /// Restore defaults, keeping the recent scripts list
    Reset,

    /// Print the preferences file location
    Path,
}

impl PrefsAction {
    pub async fn execute(self, launcher: &mut Launcher) -> Result<()> {
        match self {
            Self::Show => {
                println!("{}", serde_json::to_string_pretty(&launcher.prefs)?);
            }
            Self::Set {
                auto_scroll,
                show_timestamps,
                execution_policy,
            } => {
                let edit = PreferencesEdit {
                    auto_scroll,
                    show_timestamps,
                    execution_policy,
                };
                if edit.is_empty() {
                    return Err(CliError::invalid_input(
                        "nothing to change; pass --auto-scroll, --show-timestamps or --execution-policy",
                    ));
                }
                launcher.prefs = launcher.prefs.apply(edit);
                launcher.store.save(&launcher.prefs);
                println!("{}", serde_json::to_string_pretty(&launcher.prefs)?);
            }
            Self::Reset => {
                launcher.prefs = Preferences {
                    recent_scripts: std::mem::take(&mut launcher.prefs.recent_scripts),
                    ..Preferences::default()
                };
                launcher.store.save(&launcher.prefs);
                if !launcher.quiet {
                    eprintln!("Preferences reset to defaults");
                }
            }
            Self::Path => {
                println!("{}", launcher.store.path().display());
            }
        }
        Ok(())
    }
}
