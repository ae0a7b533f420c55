//! Invocation validation and command construction.
//!
//! These are the pure steps of handling a preview request: checking the host
//! version, deciding what file to render, finding runme and building its
//! command line. [`crate::Previewer`] sequences them and acts on the result.

use std::path::{Path, PathBuf};

use tracing::debug;

use runme_preview_core::{Error, Platform, PreviewConfig, Result, SessionId};

use crate::executable::{find_executable, is_executable};
use crate::host::{EditorHost, HostVersion};
use crate::snapshot::{tmp_file, SnapshotFile};
use crate::supervisor::CommandLine;

/// Oldest host version the previewer runs on.
pub const MIN_HOST_VERSION: HostVersion = HostVersion::new(0, 8, 0);

/// File extensions accepted as markdown (compared case-insensitively).
pub const MARKDOWN_EXTENSIONS: &[&str] = &[
    "md", "markdown", "mkd", "mkdn", "mdwn", "mdown", "mdtxt", "mdtext", "rmd", "wiki",
];

/// Buffer filetypes accepted as markdown.
pub const MARKDOWN_FILETYPES: &[&str] = &[
    "markdown",
    "markdown.pandoc",
    "markdown.gfm",
    "wiki",
    "vimwiki",
    "telekasten",
    "rmd",
];

/// A preview request: the user command's argument and force flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Explicit file to render; None renders the current buffer
    pub file: Option<PathBuf>,
    /// Close the panel instead of ignoring a re-invocation from it
    pub force: bool,
}

impl Invocation {
    /// Render `file`.
    pub fn file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            force: false,
        }
    }

    /// Render the current buffer.
    pub fn buffer() -> Self {
        Self::default()
    }

    /// Set the force flag.
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// What an invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new session is running in a new panel
    Spawned(SessionId),
    /// The focused panel was closed (forced re-invocation)
    Closed,
    /// Re-invoked from the focused panel without force; nothing happened
    Ignored,
    /// runme is being installed; the invocation is retried afterwards
    Installing,
}

/// The file handed to runme.
#[derive(Debug)]
pub enum Target {
    /// An existing file on disk
    File(PathBuf),
    /// A snapshot of the current buffer
    Snapshot(SnapshotFile),
}

impl Target {
    /// Path to pass on the command line.
    pub fn path(&self) -> &Path {
        match self {
            Target::File(path) => path,
            Target::Snapshot(snapshot) => snapshot.path(),
        }
    }

    /// Split into the path and the snapshot the session must own.
    pub fn into_parts(self) -> (PathBuf, Option<SnapshotFile>) {
        match self {
            Target::File(path) => (path, None),
            Target::Snapshot(snapshot) => (snapshot.path().to_path_buf(), Some(snapshot)),
        }
    }
}

/// Fail with [`Error::UnsupportedRuntime`] when the host is too old.
pub fn check_host_version(version: HostVersion) -> Result<()> {
    if version < MIN_HOST_VERSION {
        return Err(Error::UnsupportedRuntime {
            found: version.to_string(),
            required: MIN_HOST_VERSION.to_string(),
        });
    }
    Ok(())
}

/// Whether `path` has a markdown extension.
pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Whether a buffer filetype is a markdown variant.
pub fn is_markdown_filetype(filetype: &str) -> bool {
    MARKDOWN_FILETYPES.contains(&filetype)
}

/// Decide what to render.
///
/// An explicit file must have a markdown extension and be readable.
/// Otherwise the current buffer must be markdown and is snapshotted to a
/// temp file.
pub fn resolve_target(file: Option<&Path>, host: &dyn EditorHost) -> Result<Target> {
    match file {
        Some(path) => {
            if !is_markdown_path(path) {
                return Err(Error::UnsupportedFile(path.display().to_string()));
            }
            let unreadable = |reason: String| Error::FileUnreadable {
                path: path.to_path_buf(),
                reason,
            };
            let file = std::fs::File::open(path).map_err(|e| unreadable(e.to_string()))?;
            let metadata = file.metadata().map_err(|e| unreadable(e.to_string()))?;
            if !metadata.is_file() {
                return Err(unreadable("not a regular file".to_string()));
            }
            Ok(Target::File(path.to_path_buf()))
        }
        None => {
            let filetype = host.current_filetype();
            if !is_markdown_filetype(&filetype) {
                return Err(Error::UnsupportedFile(format!(
                    "current buffer has filetype '{filetype}'"
                )));
            }
            Ok(Target::Snapshot(tmp_file(&host.current_lines())?))
        }
    }
}

/// Find the runme executable.
///
/// Checked in order: the configured `runme_path`, the install directory,
/// then `PATH`. Candidates that are not executable are skipped. None means
/// runme must be installed.
pub fn resolve_runme(config: &PreviewConfig) -> Option<PathBuf> {
    if let Some(path) = &config.runme_path {
        if is_executable(path) {
            return Some(path.clone());
        }
        debug!("Configured runme is not executable: {}", path.display());
    }

    let installed = config.install_path.join(runme_binary_name());
    if is_executable(&installed) {
        debug!("Using installed runme: {}", installed.display());
        return Some(installed);
    }

    find_executable("runme")
}

fn runme_binary_name() -> &'static str {
    Platform::detect()
        .map(|platform| platform.binary_name())
        .unwrap_or("runme")
}

/// Build `<runme> -s <style> [-p] <file>`.
pub fn build_command(runme: &Path, config: &PreviewConfig, file: &Path) -> CommandLine {
    let mut args = vec!["-s".to_string(), config.style.clone()];
    if config.pager {
        args.push("-p".to_string());
    }
    args.push(file.display().to_string());
    CommandLine::new(runme, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;

    #[test]
    fn test_host_version_check() {
        assert!(check_host_version(HostVersion::new(0, 8, 0)).is_ok());
        assert!(check_host_version(HostVersion::new(0, 10, 1)).is_ok());
        assert!(matches!(
            check_host_version(HostVersion::new(0, 7, 2)),
            Err(Error::UnsupportedRuntime { .. })
        ));
    }

    #[test]
    fn test_markdown_extensions() {
        assert!(is_markdown_path(Path::new("README.md")));
        assert!(is_markdown_path(Path::new("docs/Guide.MARKDOWN")));
        assert!(is_markdown_path(Path::new("notes.Rmd")));
        assert!(!is_markdown_path(Path::new("notes.txt")));
        assert!(!is_markdown_path(Path::new("Makefile")));
    }

    #[test]
    fn test_markdown_filetypes() {
        assert!(is_markdown_filetype("markdown"));
        assert!(is_markdown_filetype("vimwiki"));
        assert!(!is_markdown_filetype("rust"));
        assert!(!is_markdown_filetype(""));
    }

    #[cfg(unix)]
    #[test]
    fn test_markdown_named_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        std::fs::create_dir(&notes).unwrap();

        let result = resolve_target(Some(&notes), &MockHost::new());
        match result {
            Err(Error::FileUnreadable { path, reason }) => {
                assert_eq!(path, notes);
                assert_eq!(reason, "not a regular file");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_file() {
        let host = MockHost::new();
        let result = resolve_target(Some(Path::new("notes.txt")), &host);
        assert!(matches!(result, Err(Error::UnsupportedFile(_))));
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("notes.md");

        let host = MockHost::new();
        let result = resolve_target(Some(&missing), &host);
        assert!(matches!(result, Err(Error::FileUnreadable { .. })));
    }

    #[test]
    fn test_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n").unwrap();

        let host = MockHost::new();
        let target = resolve_target(Some(&path), &host).unwrap();
        assert_eq!(target.path(), path.as_path());
        assert!(target.into_parts().1.is_none());
    }

    #[test]
    fn test_buffer_snapshot() {
        let mut host = MockHost::new();
        host.lines = vec!["# Draft".to_string(), "text".to_string()];

        let target = resolve_target(None, &host).unwrap();
        let (path, snapshot) = target.into_parts();
        assert!(snapshot.is_some());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Draft\ntext\n");
    }

    #[test]
    fn test_buffer_wrong_filetype() {
        let mut host = MockHost::new();
        host.filetype = "lua".to_string();

        let result = resolve_target(None, &host);
        assert!(matches!(result, Err(Error::UnsupportedFile(_))));
    }

    #[test]
    fn test_empty_buffer() {
        let mut host = MockHost::new();
        host.lines.clear();

        let result = resolve_target(None, &host);
        assert!(matches!(result, Err(Error::EmptyBuffer)));
    }

    #[test]
    fn test_build_command() {
        let config = PreviewConfig {
            style: "light".to_string(),
            ..Default::default()
        };
        let command = build_command(Path::new("/bin/runme"), &config, Path::new("a.md"));
        assert_eq!(command.to_string(), "/bin/runme -s light a.md");

        let config = PreviewConfig {
            pager: true,
            ..config
        };
        let command = build_command(Path::new("/bin/runme"), &config, Path::new("a.md"));
        assert_eq!(command.args, vec!["-s", "light", "-p", "a.md"]);
    }

    #[cfg(unix)]
    fn fake_runme(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let runme = dir.join("runme");
        std::fs::write(&runme, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&runme, std::fs::Permissions::from_mode(0o755)).unwrap();
        runme
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_runme_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let runme = fake_runme(dir.path());

        let config = PreviewConfig {
            install_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(resolve_runme(&config), Some(runme));
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_runme_wins() {
        let configured = tempfile::tempdir().unwrap();
        let installed = tempfile::tempdir().unwrap();
        let runme = fake_runme(configured.path());
        fake_runme(installed.path());

        let config = PreviewConfig {
            runme_path: Some(runme.clone()),
            install_path: installed.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(resolve_runme(&config), Some(runme));
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_runme_not_executable_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let installed = fake_runme(dir.path());

        let config = PreviewConfig {
            runme_path: Some(dir.path().join("missing-runme")),
            install_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(resolve_runme(&config), Some(installed));
    }
}
