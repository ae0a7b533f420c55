//! # runme-preview
//!
//! Terminal front end for previewing markdown rendered by runme.
//!
//! ## Architecture
//!
//! This is Layer 3 - the binary that ties together:
//! - runme-preview-core: Core types and configuration
//! - runme-preview-relay: Output relay and terminal emulation
//! - runme-preview-session: Supervisor, panel and event loop
//!
//! and adds the pieces that touch the outside world: argument parsing, the
//! release installer and the terminal-backed [`EditorHost`] implementation.
//!
//! [`EditorHost`]: runme_preview_session::EditorHost

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod installer;
pub mod terminal_host;

use std::io::BufRead;

use anyhow::Context;

use runme_preview_core::PreviewConfig;

pub use args::{complete_path, CliArgs, USAGE};
pub use installer::ReleaseInstaller;
pub use terminal_host::TerminalHost;

/// Resolve the configuration: defaults, then the YAML file, then flags.
pub fn load_config(args: &CliArgs) -> anyhow::Result<PreviewConfig> {
    let base = match &args.config {
        Some(path) => PreviewConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PreviewConfig::default(),
    };
    base.merged(&args.overrides())
        .context("invalid command-line options")
}

/// Read markdown lines from `reader`, the buffer previewed without a file.
pub fn read_buffer<R: BufRead>(reader: R) -> anyhow::Result<Vec<String>> {
    reader
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .context("failed to read markdown from stdin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.yaml");
        std::fs::write(&path, "style: light\nwidth: 60\n").unwrap();

        let args = CliArgs {
            config: Some(path),
            pager: true,
            ..Default::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.style, "light");
        assert_eq!(config.width, 60);
        assert!(config.pager);

        let args = CliArgs {
            style: Some("notty".to_string()),
            ..args
        };
        assert_eq!(load_config(&args).unwrap().style, "notty");
    }

    #[test]
    fn test_load_config_errors() {
        let args = CliArgs {
            config: Some("/nonexistent/preview.yaml".into()),
            ..Default::default()
        };
        assert!(load_config(&args).is_err());

        let args = CliArgs {
            style: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_read_buffer() {
        let lines = read_buffer(&b"# Title\r\n\nbody"[..]).unwrap();
        assert_eq!(lines, vec!["# Title", "", "body"]);
    }
}
