//! Locating and checking executables.

use std::path::{Path, PathBuf};

use runme_preview_core::{Error, Result};

/// Check that `path` names an executable file.
///
/// Fails with [`Error::ExecutableNotFound`] when nothing exists at `path` and
/// with [`Error::ExecutableInvalid`] when it is not an executable file.
pub fn check_executable(path: &Path) -> Result<()> {
    let metadata =
        std::fs::metadata(path).map_err(|_| Error::ExecutableNotFound(path.to_path_buf()))?;

    if !metadata.is_file() {
        return Err(Error::ExecutableInvalid(path.to_path_buf()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(Error::ExecutableInvalid(path.to_path_buf()));
        }
    }

    Ok(())
}

/// Whether `path` names an executable file.
pub fn is_executable(path: &Path) -> bool {
    check_executable(path).is_ok()
}

/// Search `PATH` for an executable called `name`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    if cfg!(windows) && Path::new(name).extension().is_none() {
        vec![dir.join(format!("{name}.exe")), dir.join(name)]
    } else {
        vec![dir.join(name)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable() {
        let result = check_executable(Path::new("/nonexistent/runme"));
        assert!(matches!(result, Err(Error::ExecutableNotFound(_))));
    }

    #[test]
    fn test_directory_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_executable(dir.path());
        assert!(matches!(result, Err(Error::ExecutableInvalid(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runme");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();

        let result = check_executable(&path);
        assert!(matches!(result, Err(Error::ExecutableInvalid(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_shell_on_path() {
        let sh = find_executable("sh").expect("sh should be on PATH");
        assert!(is_executable(&sh));
    }

    #[test]
    fn test_find_missing_on_path() {
        assert!(find_executable("definitely-not-a-real-binary-8f2c").is_none());
    }
}
