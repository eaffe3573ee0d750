use crate::cli::commands::*;
use crate::cli::config::{LauncherPaths, HOME_ENV_VAR};
use crate::cli::error::Result;
use crate::core::catalog::ScriptCatalog;
use crate::core::preferences::{PreferenceStore, Preferences};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing::debug;

/// List, run and manage local PowerShell and batch scripts
#[derive(Parser)]
#[command(name = "yonky", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress status output (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding scripts/ and config.json (defaults to the executable's directory)
    #[arg(long, global = true, env = HOME_ENV_VAR)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available scripts
    List(ListCommand),

    /// Run a script and stream its output
    Run(RunCommand),

    /// Copy an existing script into the catalog
    Add(AddCommand),

    /// Create a new script from a template
    New(NewCommand),

    /// Delete a script
    Delete(DeleteCommand),

    /// Open a script with the default editor
    Edit(EditCommand),

    /// Open the scripts folder in the file manager
    OpenFolder,

    /// Start an interactive PowerShell session in the scripts folder
    Console(ConsoleCommand),

    /// Show recently run scripts
    Recent,

    /// View or change preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Top-level controller state owned for the lifetime of one invocation
///
/// Preferences are loaded once here and passed down by reference; nothing
/// else holds a copy that could drift.
pub struct Launcher {
    pub paths: LauncherPaths,
    pub store: PreferenceStore,
    pub prefs: Preferences,
    pub catalog: ScriptCatalog,
    pub quiet: bool,
}

impl Launcher {
    /// Prepare the directory layout and load preferences
    pub fn open(paths: LauncherPaths, quiet: bool) -> Result<Self> {
        let catalog = ScriptCatalog::new(&paths.scripts_dir);
        catalog.ensure_dir()?;

        let store = PreferenceStore::new(&paths.config_file);
        let prefs = store.load();
        debug!(?prefs, "Loaded preferences");

        Ok(Self {
            paths,
            store,
            prefs,
            catalog,
            quiet,
        })
    }

    /// Persist preferences on the way out
    pub fn shutdown(self) {
        self.store.save(&self.prefs);
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        if let Commands::Completion { shell } = self.command {
            generate_completion(shell);
            return Ok(());
        }

        let paths = LauncherPaths::resolve(self.base_dir.as_deref())?;
        let mut launcher = Launcher::open(paths, self.quiet)?;

        let result = match self.command {
            Commands::List(cmd) => cmd.execute(&mut launcher).await,
            Commands::Run(cmd) => cmd.execute(&mut launcher).await,
            Commands::Add(cmd) => cmd.execute(&mut launcher).await,
            Commands::New(cmd) => cmd.execute(&mut launcher).await,
            Commands::Delete(cmd) => cmd.execute(&mut launcher).await,
            Commands::Edit(cmd) => cmd.execute(&mut launcher).await,
            Commands::OpenFolder => open_folder(&mut launcher).await,
            Commands::Console(cmd) => cmd.execute(&mut launcher).await,
            Commands::Recent => show_recent(&mut launcher).await,
            Commands::Prefs { action } => action.execute(&mut launcher).await,
            Commands::Completion { shell } => {
                generate_completion(shell);
                Ok(())
            }
        };

        launcher.shutdown();
        result
    }
}

/// Generate shell completion script
fn generate_completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
