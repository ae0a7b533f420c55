//! Error types for runme-preview.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for runme-preview operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Host editor is older than the minimum supported version
    #[error("Unsupported runtime: {found} (requires {required} or newer)")]
    UnsupportedRuntime {
        /// Version reported by the host
        found: String,
        /// Minimum version required
        required: String,
    },

    /// A tool needed by the installer is not on PATH
    #[error("Missing dependency: {0} is required to install runme")]
    MissingDependency(String),

    /// OS or architecture has no published release
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The renderer binary does not exist
    #[error("Executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    /// The renderer path exists but cannot be executed
    #[error("Executable invalid: {} is not an executable file", .0.display())]
    ExecutableInvalid(PathBuf),

    /// OS process creation failed
    #[error("Failed to spawn {command}: {reason}")]
    SpawnFailed {
        /// Program that was being started
        command: String,
        /// OS-level reason
        reason: String,
    },

    /// A session is already live
    #[error("A preview session is already running")]
    SessionActive,

    /// Target is not a markdown file or buffer
    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    /// Target file cannot be read
    #[error("Cannot read {}: {reason}", .path.display())]
    FileUnreadable {
        /// Path that was checked
        path: PathBuf,
        /// OS-level reason
        reason: String,
    },

    /// Current buffer has nothing to preview
    #[error("Buffer is empty, nothing to preview")]
    EmptyBuffer,

    /// A temp file or binary could not be removed
    #[error("Failed to remove {}: {reason}", .path.display())]
    ResourceCleanupFailed {
        /// Path that could not be removed
        path: PathBuf,
        /// OS-level reason
        reason: String,
    },

    /// Host surface operation failed
    #[error("Surface error: {0}")]
    Surface(String),

    /// Download or extraction failed
    #[error("Install failed: {0}")]
    InstallFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_runtime_error() {
        let err = Error::UnsupportedRuntime {
            found: "0.7.2".to_string(),
            required: "0.8.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported runtime: 0.7.2 (requires 0.8.0 or newer)"
        );
    }

    #[test]
    fn test_executable_not_found_error() {
        let err = Error::ExecutableNotFound(PathBuf::from("/opt/runme/runme"));
        assert_eq!(err.to_string(), "Executable not found: /opt/runme/runme");
    }

    #[test]
    fn test_spawn_failed_error() {
        let err = Error::SpawnFailed {
            command: "runme".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to spawn runme: permission denied");
    }

    #[test]
    fn test_unsupported_file_error() {
        let err = Error::UnsupportedFile("notes.txt".to_string());
        assert_eq!(err.to_string(), "Unsupported file: notes.txt");
    }

    #[test]
    fn test_cleanup_failed_error() {
        let err = Error::ResourceCleanupFailed {
            path: PathBuf::from("/tmp/x.md"),
            reason: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to remove /tmp/x.md: busy");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<u16>("[not, a, number]").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
