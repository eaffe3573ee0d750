use crate::cli::error::{CliError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Folder holding the runnable scripts, relative to the base directory
pub const SCRIPTS_DIR_NAME: &str = "scripts";

/// Preferences file, relative to the base directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable that relocates the base directory
pub const HOME_ENV_VAR: &str = "YONKY_HOME";

/// Filesystem layout used by the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    /// Directory containing `scripts/` and `config.json`
    pub base_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub config_file: PathBuf,
}

impl LauncherPaths {
    /// Layout rooted at an explicit base directory
    pub fn from_base(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            scripts_dir: base_dir.join(SCRIPTS_DIR_NAME),
            config_file: base_dir.join(CONFIG_FILE_NAME),
            base_dir,
        }
    }

    /// Layout rooted beside the running executable
    pub fn beside_executable() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let base_dir = exe.parent().ok_or_else(|| {
            CliError::configuration(format!(
                "Executable path has no parent directory: {}",
                exe.display()
            ))
        })?;
        Ok(Self::from_base(base_dir))
    }

    /// Resolve the layout, preferring an explicit override
    pub fn resolve(base_dir_override: Option<&Path>) -> Result<Self> {
        let paths = match base_dir_override {
            Some(dir) => Self::from_base(dir),
            None => Self::beside_executable()?,
        };
        debug!(base_dir = %paths.base_dir.display(), "Resolved launcher paths");
        Ok(paths)
    }
}
