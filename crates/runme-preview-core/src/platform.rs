//! Platform detection and release asset resolution.
//!
//! The installer downloads a platform-specific runme archive. This module maps
//! OS and architecture names (as reported by `uname` or `std::env::consts`)
//! to the naming scheme used by the published release assets.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Release version installed when the configuration does not name one.
pub const DEFAULT_RUNME_VERSION: &str = "3.12.6";

const RELEASE_BASE_URL: &str = "https://github.com/stateful/runme/releases/download";

/// Operating systems with published runme releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Windows
    Windows,
    /// Linux
    Linux,
    /// macOS
    Darwin,
}

impl Os {
    /// Parse an OS name, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use runme_preview_core::platform::Os;
    ///
    /// assert_eq!(Os::parse("Darwin").unwrap(), Os::Darwin);
    /// assert_eq!(Os::parse("macos").unwrap(), Os::Darwin);
    /// assert!(Os::parse("plan9").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "windows" | "windows_nt" => Ok(Os::Windows),
            "linux" => Ok(Os::Linux),
            "darwin" | "macos" => Ok(Os::Darwin),
            other => Err(Error::UnsupportedPlatform(format!("OS '{other}'"))),
        }
    }

    /// Name used in release asset file names.
    pub fn name(&self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::Darwin => "darwin",
        }
    }
}

/// CPU architectures with published runme releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    /// 32-bit x86
    I386,
    /// 64-bit x86
    X86_64,
    /// 64-bit ARM
    Arm64,
}

impl Arch {
    /// Parse an architecture name, accepting the common aliases.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "i386" | "i686" | "x86" => Ok(Arch::I386),
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            other => Err(Error::UnsupportedPlatform(format!(
                "architecture '{other}'"
            ))),
        }
    }

    /// Name used in release asset file names.
    pub fn name(&self) -> &'static str {
        match self {
            Arch::I386 => "i386",
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
        }
    }
}

/// The host platform as seen by the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system
    pub os: Os,
    /// CPU architecture
    pub arch: Arch,
}

impl Platform {
    /// Detect the platform this binary was built for.
    pub fn detect() -> Result<Self> {
        Ok(Self {
            os: Os::parse(std::env::consts::OS)?,
            arch: Arch::parse(std::env::consts::ARCH)?,
        })
    }

    /// Name of the runme executable on this platform.
    pub fn binary_name(&self) -> &'static str {
        match self.os {
            Os::Windows => "runme.exe",
            _ => "runme",
        }
    }
}

/// A downloadable runme release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Platform the archive targets
    pub platform: Platform,
    /// Archive file name
    pub filename: String,
    /// Download URL
    pub url: String,
}

impl ReleaseAsset {
    /// Resolve the archive for an OS/architecture pair.
    ///
    /// Fails with [`Error::UnsupportedPlatform`] for names without a release.
    pub fn resolve(os: &str, arch: &str, version: &str) -> Result<Self> {
        let platform = Platform {
            os: Os::parse(os)?,
            arch: Arch::parse(arch)?,
        };
        Ok(Self::for_platform(platform, version))
    }

    /// Build the asset for an already parsed platform.
    pub fn for_platform(platform: Platform, version: &str) -> Self {
        let extension = match platform.os {
            Os::Windows => "zip",
            _ => "tar.gz",
        };
        let filename = format!(
            "runme_{}_{}.{}",
            platform.os.name(),
            platform.arch.name(),
            extension
        );
        let version = version.trim_start_matches('v');
        let url = format!("{RELEASE_BASE_URL}/v{version}/{filename}");

        Self {
            platform,
            filename,
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_darwin_arm64() {
        let asset = ReleaseAsset::resolve("Darwin", "arm64", "3.12.6").unwrap();
        assert!(asset.filename.contains("darwin"));
        assert!(asset.filename.contains("arm64"));
        assert!(asset.filename.ends_with(".tar.gz"));
        assert_eq!(
            asset.url,
            "https://github.com/stateful/runme/releases/download/v3.12.6/runme_darwin_arm64.tar.gz"
        );
    }

    #[test]
    fn test_resolve_windows_uses_zip() {
        let asset = ReleaseAsset::resolve("Windows_NT", "AMD64", "v3.12.6").unwrap();
        assert_eq!(asset.filename, "runme_windows_x86_64.zip");
        assert!(asset.url.contains("/v3.12.6/"));
    }

    #[test]
    fn test_arch_aliases() {
        assert_eq!(Arch::parse("aarch64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::parse("i686").unwrap(), Arch::I386);
        assert_eq!(Arch::parse("x86_64").unwrap(), Arch::X86_64);
    }

    #[test]
    fn test_unknown_os() {
        let result = ReleaseAsset::resolve("Haiku", "x86_64", "3.12.6");
        assert!(matches!(result, Err(Error::UnsupportedPlatform(_))));
    }

    #[test]
    fn test_unknown_arch() {
        let result = ReleaseAsset::resolve("linux", "riscv64", "3.12.6");
        assert!(matches!(result, Err(Error::UnsupportedPlatform(_))));
    }

    #[test]
    fn test_binary_name() {
        let platform = Platform {
            os: Os::Windows,
            arch: Arch::X86_64,
        };
        assert_eq!(platform.binary_name(), "runme.exe");
    }
}
