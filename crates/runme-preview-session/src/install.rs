//! Interface to the runme installer.

use std::path::PathBuf;

use runme_preview_core::{PreviewConfig, Result};

/// What to install and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Directory that receives the binary
    pub install_path: PathBuf,
    /// Release version to fetch
    pub version: String,
}

impl InstallRequest {
    /// Build a request from the configuration.
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            install_path: config.install_path.clone(),
            version: config.runme_version.clone(),
        }
    }
}

/// Downloads and installs the runme binary.
///
/// `install` blocks; the previewer runs it on tokio's blocking pool and
/// reports completion as [`crate::PreviewEvent::InstallFinished`].
pub trait Installer: Send + Sync {
    /// Install runme and return the path of the executable.
    fn install(&self, request: &InstallRequest) -> Result<PathBuf>;
}
