//! Command-line arguments and path completion.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use runme_preview_core::ConfigOverrides;
use runme_preview_session::Invocation;

/// Usage text printed by `--help`.
pub const USAGE: &str = "\
Usage: runme-preview [OPTIONS] [FILE]

Preview a markdown file rendered by runme in a floating panel.
Without FILE, markdown is read from stdin.

Options:
  -f, --force             Close the preview instead of ignoring a re-invocation
  -c, --config <PATH>     Load configuration from a YAML file
  -s, --style <STYLE>     Style passed to runme (default: dark)
  -p, --pager             Start runme with its pager
      --complete <PREFIX> Print file completions for PREFIX and exit
  -h, --help              Print this help
  -V, --version           Print the version

Press q or Esc to close the panel.

Environment:
  RUST_LOG                Log filter (default: warn), written to stderr";

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// File to preview; None reads stdin
    pub file: Option<PathBuf>,
    /// Force flag of the invocation
    pub force: bool,
    /// YAML configuration file
    pub config: Option<PathBuf>,
    /// Style override
    pub style: Option<String>,
    /// Pager override
    pub pager: bool,
    /// Prefix to complete instead of previewing
    pub complete: Option<String>,
    /// Print usage
    pub help: bool,
    /// Print version
    pub version: bool,
}

impl CliArgs {
    /// Parse arguments, program name excluded.
    pub fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        let mut positional_only = false;

        while let Some(arg) = args.next() {
            if positional_only || !arg.starts_with('-') || arg == "-" {
                if parsed.file.is_some() {
                    bail!("unexpected argument '{arg}': only one file can be previewed");
                }
                parsed.file = Some(PathBuf::from(arg));
                continue;
            }

            match arg.as_str() {
                "--" => positional_only = true,
                "-f" | "--force" => parsed.force = true,
                "-p" | "--pager" => parsed.pager = true,
                "-h" | "--help" => parsed.help = true,
                "-V" | "--version" => parsed.version = true,
                "-c" | "--config" => {
                    let value = args.next().context("--config requires a path")?;
                    parsed.config = Some(PathBuf::from(value));
                }
                "-s" | "--style" => {
                    parsed.style = Some(args.next().context("--style requires a value")?);
                }
                "--complete" => {
                    parsed.complete = Some(args.next().unwrap_or_default());
                }
                other => bail!("unknown option '{other}'\n\n{USAGE}"),
            }
        }

        // "-" is an explicit request for stdin
        if parsed.file.as_deref() == Some(Path::new("-")) {
            parsed.file = None;
        }

        Ok(parsed)
    }

    /// Configuration overrides given on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            style: self.style.clone(),
            pager: self.pager.then_some(true),
            ..Default::default()
        }
    }

    /// The preview request.
    pub fn invocation(&self) -> Invocation {
        Invocation {
            file: self.file.clone(),
            force: self.force,
        }
    }
}

/// Filesystem entries starting with `prefix`, directories suffixed with `/`.
///
/// Hidden entries are listed only when the prefix's last component starts
/// with a dot. Unreadable directories yield no completions.
pub fn complete_path(prefix: &str) -> Vec<String> {
    let (dir_part, stem) = match prefix.rfind('/') {
        Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
        None => ("", prefix),
    };
    let dir = if dir_part.is_empty() {
        Path::new(".")
    } else {
        Path::new(dir_part)
    };

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut completions: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(stem) || (name.starts_with('.') && !stem.starts_with('.')) {
                return None;
            }
            let is_dir = entry.path().is_dir();
            Some(format!(
                "{dir_part}{name}{}",
                if is_dir { "/" } else { "" }
            ))
        })
        .collect();

    completions.sort();
    completions
}
