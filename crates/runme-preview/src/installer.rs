//! Installing runme from its GitHub releases.
//!
//! Downloads go through `curl` and extraction through `tar`, both of which
//! must be on `PATH`. The archive is staged in a temp directory, so a failed
//! install never leaves a partial binary in the install directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use runme_preview_core::{Error, Platform, ReleaseAsset, Result};
use runme_preview_session::{find_executable, InstallRequest, Installer};

/// Installer fetching release archives with `curl` and `tar`.
#[derive(Debug, Clone)]
pub struct ReleaseInstaller {
    curl: String,
    tar: String,
}

impl ReleaseInstaller {
    /// Installer using `curl` and `tar` from `PATH`.
    pub fn new() -> Self {
        Self::with_tools("curl", "tar")
    }

    /// Installer using the named download and extraction tools.
    pub fn with_tools(curl: impl Into<String>, tar: impl Into<String>) -> Self {
        Self {
            curl: curl.into(),
            tar: tar.into(),
        }
    }

    fn download(&self, curl: &Path, asset: &ReleaseAsset, dest: &Path) -> Result<()> {
        info!("Downloading {}", asset.url);
        let mut command = Command::new(curl);
        command.arg("-fsSL").arg("-o").arg(dest).arg(&asset.url);
        run(command, "download")
    }
}

impl Default for ReleaseInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl Installer for ReleaseInstaller {
    fn install(&self, request: &InstallRequest) -> Result<PathBuf> {
        let curl = require_tool(&self.curl)?;
        let tar = require_tool(&self.tar)?;

        let platform = Platform::detect()?;
        let asset = ReleaseAsset::for_platform(platform, &request.version);
        debug!("Resolved release asset: {:?}", asset);

        let staging = tempfile::Builder::new()
            .prefix("runme-preview-install-")
            .tempdir()?;
        let archive = staging.path().join(&asset.filename);

        self.download(&curl, &asset, &archive)?;
        extract(&tar, &archive, staging.path())?;

        let extracted = staging.path().join(platform.binary_name());
        if !extracted.is_file() {
            return Err(Error::InstallFailed(format!(
                "{} does not contain {}",
                asset.filename,
                platform.binary_name()
            )));
        }

        let installed = place_binary(&extracted, &request.install_path, platform.binary_name())?;
        info!("Installed runme v{} at {}", request.version, installed.display());
        Ok(installed)
    }
}

/// Locate a tool the installer shells out to.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    find_executable(name).ok_or_else(|| Error::MissingDependency(name.to_string()))
}

/// Unpack `archive` into `dest`.
pub fn extract(tar: &Path, archive: &Path, dest: &Path) -> Result<()> {
    debug!("Extracting {} into {}", archive.display(), dest.display());
    let mut command = Command::new(tar);
    command.arg("-xf").arg(archive).arg("-C").arg(dest);
    run(command, "extract")
}

/// Move `extracted` into `install_dir` as `name` and make it executable.
///
/// A binary already at the target is removed first.
pub fn place_binary(extracted: &Path, install_dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(install_dir)?;
    let target = install_dir.join(name);

    if target.exists() {
        debug!("Removing previous binary: {}", target.display());
        std::fs::remove_file(&target).map_err(|e| Error::ResourceCleanupFailed {
            path: target.clone(),
            reason: e.to_string(),
        })?;
    }

    // Staging may live on another filesystem
    if std::fs::rename(extracted, &target).is_err() {
        std::fs::copy(extracted, &target)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(target)
}

fn run(mut command: Command, step: &str) -> Result<()> {
    let output = command
        .output()
        .map_err(|e| Error::InstallFailed(format!("{step}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::InstallFailed(format!(
            "{step} failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool() {
        let installer = ReleaseInstaller::with_tools("runme-preview-no-such-curl", "tar");
        let request = InstallRequest {
            install_path: PathBuf::from("/nonexistent"),
            version: "3.12.6".to_string(),
        };

        let result = installer.install(&request);
        assert!(
            matches!(result, Err(Error::MissingDependency(ref tool)) if tool == "runme-preview-no-such-curl")
        );
    }

    #[test]
    fn test_place_binary_replaces_existing() {
        let staging = tempfile::tempdir().unwrap();
        let install = tempfile::tempdir().unwrap();
        let extracted = staging.path().join("runme");
        std::fs::write(&extracted, "new").unwrap();
        std::fs::write(install.path().join("runme"), "old").unwrap();

        let target = place_binary(&extracted, install.path(), "runme").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert!(!extracted.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_place_binary_creates_install_dir() {
        let staging = tempfile::tempdir().unwrap();
        let extracted = staging.path().join("runme");
        std::fs::write(&extracted, "bin").unwrap();
        let install_dir = staging.path().join("a").join("b");

        let target = place_binary(&extracted, &install_dir, "runme").unwrap();
        assert_eq!(target, install_dir.join("runme"));
        assert!(target.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_release_layout() {
        let Ok(tar) = require_tool("tar") else {
            return;
        };

        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("runme"), "#!/bin/sh\n").unwrap();
        std::fs::write(source.path().join("LICENSE"), "MIT").unwrap();

        let staging = tempfile::tempdir().unwrap();
        let archive = staging.path().join("runme_linux_x86_64.tar.gz");
        let status = Command::new(&tar)
            .arg("-czf")
            .arg(&archive)
            .arg("-C")
            .arg(source.path())
            .arg("runme")
            .arg("LICENSE")
            .status()
            .unwrap();
        assert!(status.success());

        extract(&tar, &archive, staging.path()).unwrap();
        assert!(staging.path().join("runme").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_corrupt_archive() {
        let Ok(tar) = require_tool("tar") else {
            return;
        };

        let staging = tempfile::tempdir().unwrap();
        let archive = staging.path().join("broken.tar.gz");
        std::fs::write(&archive, "not an archive").unwrap();

        let result = extract(&tar, &archive, staging.path());
        assert!(matches!(result, Err(Error::InstallFailed(_))));
    }
}
