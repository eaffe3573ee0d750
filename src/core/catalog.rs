//! Script catalog
//!
//! A flat directory of `.ps1`, `.bat` and `.cmd` files. Listing is derived
//! from the filesystem on every call; nothing is cached between refreshes.

use crate::core::error::{Error, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument, warn};

/// Extension appended to new script names that carry none
pub const PRIMARY_EXTENSION: &str = "ps1";

/// How a script file is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// `.ps1`, run through the PowerShell host
    PowerShell,
    /// `.bat` / `.cmd`, executed directly
    Batch,
}

impl ScriptKind {
    /// Classify a file name by its extension, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ps1" => Some(Self::PowerShell),
            "bat" | "cmd" => Some(Self::Batch),
            _ => None,
        }
    }

    /// Stub content for a freshly created script
    fn template(self, name: &str, created: DateTime<Local>) -> String {
        let stamp = created.format("%Y-%m-%d %H:%M:%S");
        match self {
            Self::PowerShell => format!(
                "# New PowerShell Script\n# Created: {stamp}\n\nWrite-Host 'Hello from {name}'\n"
            ),
            Self::Batch => format!(
                "@echo off\r\nREM New Batch Script\r\nREM Created: {stamp}\r\n\r\necho Hello from {name}\r\n"
            ),
        }
    }
}

/// One listed script file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    /// File name including extension
    pub name: String,
    /// Last modification time; `None` when the metadata could not be read
    pub modified: Option<DateTime<Local>>,
    /// File size in bytes; zero when the metadata could not be read
    pub size_bytes: u64,
}

impl ScriptEntry {
    fn from_metadata(name: String, metadata: io::Result<fs::Metadata>) -> Self {
        match metadata {
            Ok(metadata) => Self {
                name,
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
                size_bytes: metadata.len(),
            },
            Err(e) => {
                debug!(name = %name, error = %e, "Could not read script metadata");
                Self {
                    name,
                    modified: None,
                    size_bytes: 0,
                }
            }
        }
    }

    /// Modification time as shown in listings, or `Error`
    pub fn modified_display(&self) -> String {
        match self.modified {
            Some(modified) => modified.format("%Y-%m-%d %H:%M").to_string(),
            None => "Error".to_string(),
        }
    }

    /// Size in kilobytes with one decimal place
    pub fn size_kb_display(&self) -> String {
        format!("{:.1}", self.size_bytes as f64 / 1024.0)
    }
}

/// Check that `name` is a single plain file name inside the catalog
///
/// Rejects empty names, `.`/`..`, anything containing a path separator and
/// anything the platform would parse as more than one normal component.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = || Error::InvalidScriptName(name.to_string());

    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(invalid()),
    }
}

fn has_script_extension(name: &str) -> bool {
    ScriptKind::from_name(name).is_some()
}

/// The directory of runnable scripts
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    dir: PathBuf,
}

impl ScriptCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the catalog directory if it does not exist yet
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            info!(dir = %self.dir.display(), "Created scripts directory");
        }
        Ok(())
    }

    /// List scripts sorted by name
    ///
    /// A missing directory is an empty catalog. Entries whose metadata cannot
    /// be read are still listed, with the error sentinel.
    #[instrument(name = "catalog_list", skip_all, fields(dir = %self.dir.display()))]
    pub fn list(&self) -> Result<Vec<ScriptEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = match dir_entry {
                Ok(dir_entry) => dir_entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let Ok(name) = dir_entry.file_name().into_string() else {
                continue;
            };
            if !has_script_extension(&name) {
                continue;
            }
            if dir_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }

            entries.push(ScriptEntry::from_metadata(
                name,
                fs::metadata(dir_entry.path()),
            ));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = entries.len(), "Listed scripts");
        Ok(entries)
    }

    /// Join the catalog directory and a validated script name
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Look up a single entry by name
    pub fn entry(&self, name: &str) -> Result<ScriptEntry> {
        let path = self.resolve_path(name)?;
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {
                Ok(ScriptEntry::from_metadata(name.to_string(), Ok(metadata)))
            }
            Ok(_) => Err(Error::ScriptNotFound(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::ScriptNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copy an external file into the catalog under its base name
    ///
    /// An existing script with the same name is overwritten.
    #[instrument(name = "catalog_add", skip_all, fields(source = %source.as_ref().display()))]
    pub fn add(&self, source: impl AsRef<Path>) -> Result<ScriptEntry> {
        let source = source.as_ref();
        let name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidScriptName(source.display().to_string()))?
            .to_string();
        let dest = self.resolve_path(&name)?;

        self.ensure_dir()?;
        let bytes = fs::read(source)?;
        fs::write(&dest, bytes)?;

        if !has_script_extension(&name) {
            warn!(name = %name, "Added file has no script extension and will not be listed");
        }
        info!(name = %name, "Added script");
        self.entry(&name)
    }

    /// Write a new script from a template
    ///
    /// Names without a supported extension get `.ps1` appended. Refuses blank
    /// names and refuses to replace an existing file.
    #[instrument(name = "catalog_create", skip_all, fields(name = %base_name))]
    pub fn create(&self, base_name: &str) -> Result<ScriptEntry> {
        let base_name = base_name.trim();
        if base_name.is_empty() {
            return Err(Error::InvalidScriptName(base_name.to_string()));
        }
        let name = if has_script_extension(base_name) {
            base_name.to_string()
        } else {
            format!("{base_name}.{PRIMARY_EXTENSION}")
        };
        let path = self.resolve_path(&name)?;
        // Anything the listing would not show is refused
        let Some(kind) = ScriptKind::from_name(&name) else {
            return Err(Error::InvalidScriptName(name));
        };

        self.ensure_dir()?;
        let template = kind.template(&name, Local::now());
        match write_new_file(&path, |file| io::Write::write_all(file, template.as_bytes())) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::ScriptExists(name));
            }
            Err(e) => return Err(e.into()),
        }

        info!(path = %path.display(), "Created new script");
        self.entry(&name)
    }

    /// Delete a script
    #[instrument(name = "catalog_remove", skip(self))]
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.resolve_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(name = %name, "Deleted script");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::ScriptNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open a script with the desktop's default handler
    pub fn edit(&self, name: &str) -> Result<()> {
        let entry = self.entry(name)?;
        open_with_default_app(&self.dir.join(&entry.name))
    }

    /// Open the catalog directory in the desktop file manager
    pub fn open_folder(&self) -> Result<()> {
        self.ensure_dir()?;
        open_with_default_app(&self.dir)
    }
}

/// Create `path`, failing if it exists, and fill it
///
/// A failed fill removes the file again so a retry does not hit
/// `AlreadyExists`.
fn write_new_file<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    if let Err(e) = fill(&mut file) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %cleanup, "Could not remove partial script");
        }
        return Err(e);
    }
    Ok(())
}

/// Hand a path to the OS default opener and return without waiting
#[instrument(skip_all, fields(path = %path.display()))]
pub fn open_with_default_app(path: &Path) -> Result<()> {
    let mut command = opener_command(path);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let child = command.spawn()?;
    debug!(pid = child.id(), "Spawned default opener");
    // Detached: the opener outlives this call
    drop(child);
    Ok(())
}

#[cfg(windows)]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(path);
    command
}

#[cfg(target_os = "macos")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg(path);
    command
}

#[cfg(not(any(windows, target_os = "macos")))]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn catalog_with(files: &[(&str, usize)]) -> (tempfile::TempDir, ScriptCatalog) {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("scripts");
        fs::create_dir_all(&dir).unwrap();
        for (name, size) in files {
            fs::write(dir.join(name), vec![b'x'; *size]).unwrap();
        }
        (temp_dir, ScriptCatalog::new(dir))
    }

    #[test]
    fn test_script_kind_from_name() {
        assert_eq!(ScriptKind::from_name("a.ps1"), Some(ScriptKind::PowerShell));
        assert_eq!(ScriptKind::from_name("a.PS1"), Some(ScriptKind::PowerShell));
        assert_eq!(ScriptKind::from_name("b.bat"), Some(ScriptKind::Batch));
        assert_eq!(ScriptKind::from_name("c.cmd"), Some(ScriptKind::Batch));
        assert_eq!(ScriptKind::from_name("notes.txt"), None);
        assert_eq!(ScriptKind::from_name("ps1"), None);
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let (_temp, catalog) = catalog_with(&[("b.bat", 0), ("notes.txt", 12), ("a.ps1", 1024)]);

        let entries = catalog.list().unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.ps1", "b.bat"]);
        assert_eq!(entries[0].size_bytes, 1024);
        assert_eq!(entries[0].size_kb_display(), "1.0");
        assert_eq!(entries[1].size_bytes, 0);
        assert!(entries[0].modified.is_some());
    }

    #[test]
    fn test_list_is_idempotent() {
        let (_temp, catalog) = catalog_with(&[("z.cmd", 3), ("m.ps1", 7), ("a.bat", 1)]);
        assert_eq!(catalog.list().unwrap(), catalog.list().unwrap());
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp_dir = tempdir().unwrap();
        let catalog = ScriptCatalog::new(temp_dir.path().join("does-not-exist"));
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_directories() {
        let (_temp, catalog) = catalog_with(&[("a.ps1", 1)]);
        fs::create_dir(catalog.dir().join("folder.ps1")).unwrap();

        let entries = catalog.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.ps1");
    }

    #[cfg(unix)]
    #[test]
    fn test_list_keeps_entries_with_unreadable_metadata() {
        let (_temp, catalog) = catalog_with(&[("a.ps1", 4)]);
        std::os::unix::fs::symlink(
            catalog.dir().join("missing-target"),
            catalog.dir().join("dangling.cmd"),
        )
        .unwrap();

        let entries = catalog.list().unwrap();
        assert_eq!(entries.len(), 2);
        let dangling = &entries[1];
        assert_eq!(dangling.name, "dangling.cmd");
        assert_eq!(dangling.size_bytes, 0);
        assert_eq!(dangling.modified, None);
        assert_eq!(dangling.modified_display(), "Error");
    }

    #[test]
    fn test_validate_name_rejects_traversal() {
        for bad in ["", ".", "..", "../x.ps1", "a/b.ps1", "a\\b.ps1", "/etc/passwd", "a\0.ps1"] {
            assert!(
                matches!(validate_name(bad), Err(Error::InvalidScriptName(_))),
                "{bad:?} should be rejected"
            );
        }
        validate_name("deploy.ps1").unwrap();
        validate_name("with space.cmd").unwrap();
    }

    #[test]
    fn test_resolve_path_joins_catalog_dir() {
        let catalog = ScriptCatalog::new("/opt/yonky/scripts");
        assert_eq!(
            catalog.resolve_path("a.ps1").unwrap(),
            PathBuf::from("/opt/yonky/scripts/a.ps1")
        );
        assert!(catalog.resolve_path("../config.json").is_err());
    }

    #[test]
    fn test_add_copies_and_overwrites() {
        let (temp, catalog) = catalog_with(&[]);
        let source = temp.path().join("deploy.ps1");
        fs::write(&source, "Write-Host 'v1'").unwrap();

        let entry = catalog.add(&source).unwrap();
        assert_eq!(entry.name, "deploy.ps1");
        assert_eq!(entry.size_bytes, 15);

        fs::write(&source, "Write-Host 'v2!'").unwrap();
        catalog.add(&source).unwrap();
        assert_eq!(
            fs::read_to_string(catalog.dir().join("deploy.ps1")).unwrap(),
            "Write-Host 'v2!'"
        );
    }

    #[test]
    fn test_add_missing_source_is_io_error() {
        let (temp, catalog) = catalog_with(&[]);
        let err = catalog.add(temp.path().join("nope.ps1")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_create_appends_extension_and_writes_template() {
        let (_temp, catalog) = catalog_with(&[]);

        let entry = catalog.create("hello").unwrap();
        assert_eq!(entry.name, "hello.ps1");

        let content = fs::read_to_string(catalog.dir().join("hello.ps1")).unwrap();
        assert!(content.starts_with("# New PowerShell Script\n# Created: "));
        assert!(content.contains("Write-Host 'Hello from hello.ps1'"));
    }

    #[test]
    fn test_create_batch_template() {
        let (_temp, catalog) = catalog_with(&[]);

        let entry = catalog.create("cleanup.bat").unwrap();
        assert_eq!(entry.name, "cleanup.bat");

        let content = fs::read_to_string(catalog.dir().join("cleanup.bat")).unwrap();
        assert!(content.starts_with("@echo off"));
        assert!(content.contains("echo Hello from cleanup.bat"));
    }

    #[test]
    fn test_create_refuses_existing() {
        let (_temp, catalog) = catalog_with(&[("taken.ps1", 5)]);

        let err = catalog.create("taken").unwrap_err();
        assert!(matches!(err, Error::ScriptExists(name) if name == "taken.ps1"));
        assert_eq!(fs::read(catalog.dir().join("taken.ps1")).unwrap().len(), 5);
    }

    #[test]
    fn test_create_rejects_traversal() {
        let (_temp, catalog) = catalog_with(&[]);
        assert!(matches!(
            catalog.create("../escape"),
            Err(Error::InvalidScriptName(_))
        ));
    }

    #[test]
    fn test_create_rejects_blank_names() {
        let (_temp, catalog) = catalog_with(&[]);
        for blank in ["", "   ", "\t"] {
            assert!(
                matches!(catalog.create(blank), Err(Error::InvalidScriptName(_))),
                "{blank:?} should be rejected"
            );
        }
        assert_eq!(fs::read_dir(catalog.dir()).unwrap().count(), 0);
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn test_failed_fill_leaves_no_file_behind() {
        let (_temp, catalog) = catalog_with(&[]);
        let path = catalog.dir().join("half.ps1");

        let err = write_new_file(&path, |file| {
            io::Write::write_all(file, b"# New Power")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());

        let entry = catalog.create("half.ps1").unwrap();
        assert_eq!(entry.name, "half.ps1");
    }

    #[test]
    fn test_remove() {
        let (_temp, catalog) = catalog_with(&[("old.bat", 2)]);

        catalog.remove("old.bat").unwrap();
        assert!(catalog.list().unwrap().is_empty());
        assert!(matches!(
            catalog.remove("old.bat"),
            Err(Error::ScriptNotFound(_))
        ));
    }

    #[test]
    fn test_edit_missing_script() {
        let (_temp, catalog) = catalog_with(&[]);
        assert!(matches!(
            catalog.edit("ghost.ps1"),
            Err(Error::ScriptNotFound(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_names_with_separators_are_rejected(
            head in "[a-zA-Z0-9_.-]{0,8}",
            tail in "[a-zA-Z0-9_.-]{0,8}",
            sep in prop::sample::select(vec!['/', '\\']),
        ) {
            let name = format!("{head}{sep}{tail}");
            prop_assert!(validate_name(&name).is_err());
        }

        #[test]
        fn prop_resolved_paths_stay_in_catalog(name in "[a-zA-Z0-9_ -]{1,16}\\.(ps1|bat|cmd)") {
            let catalog = ScriptCatalog::new("scripts");
            let path = catalog.resolve_path(&name).unwrap();
            prop_assert_eq!(path.parent(), Some(Path::new("scripts")));
        }
    }
}
