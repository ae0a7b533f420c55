//! Configuration types for runme-preview.
//!
//! Configuration is applied in a fixed order: built-in defaults, then the
//! user's [`ConfigOverrides`] (typically loaded from YAML once at setup),
//! then any per-invocation overrides. The result is never mutated while a
//! preview session is running.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::platform::DEFAULT_RUNME_VERSION;
use crate::{Error, Result};

/// Fully resolved previewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Explicit path to the runme executable (None = resolve at invocation)
    pub runme_path: Option<PathBuf>,
    /// Directory the installer places the runme binary in
    pub install_path: PathBuf,
    /// Release version fetched by the installer
    pub runme_version: String,
    /// Maximum panel width in columns
    pub width: u16,
    /// Maximum panel height in rows
    pub height: u16,
    /// Panel width as a fraction of the screen width
    pub width_ratio: f32,
    /// Panel height as a fraction of the screen height
    pub height_ratio: f32,
    /// Style passed to runme with `-s`
    pub style: String,
    /// Whether runme is started with `-p`
    pub pager: bool,
    /// Border style handed to the host when creating the panel
    pub border: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            runme_path: None,
            install_path: default_install_path(),
            runme_version: DEFAULT_RUNME_VERSION.to_string(),
            width: 100,
            height: 100,
            width_ratio: 0.7,
            height_ratio: 0.7,
            style: "dark".to_string(),
            pager: false,
            border: "shadow".to_string(),
        }
    }
}

fn default_install_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("runme-preview")
        .join("bin")
}

impl PreviewConfig {
    /// Load user overrides from a YAML file and apply them over the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse user overrides from a YAML string and apply them over the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let overrides: ConfigOverrides = if yaml.trim().is_empty() {
            ConfigOverrides::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        Self::default().merged(&overrides)
    }

    /// Return a copy of this configuration with `overrides` applied on top.
    pub fn merged(&self, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = self.clone();
        if let Some(path) = &overrides.runme_path {
            config.runme_path = Some(path.clone());
        }
        if let Some(path) = &overrides.install_path {
            config.install_path = path.clone();
        }
        if let Some(version) = &overrides.runme_version {
            config.runme_version = version.clone();
        }
        if let Some(width) = overrides.width {
            config.width = width;
        }
        if let Some(height) = overrides.height {
            config.height = height;
        }
        if let Some(ratio) = overrides.width_ratio {
            config.width_ratio = ratio;
        }
        if let Some(ratio) = overrides.height_ratio {
            config.height_ratio = ratio;
        }
        if let Some(style) = &overrides.style {
            config.style = style.clone();
        }
        if let Some(pager) = overrides.pager {
            config.pager = pager;
        }
        if let Some(border) = &overrides.border {
            config.border = border.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config("width and height must be > 0".to_string()));
        }

        for (name, ratio) in [
            ("width_ratio", self.width_ratio),
            ("height_ratio", self.height_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(Error::Config(format!(
                    "{name} must be in (0, 1], got {ratio}"
                )));
            }
        }

        if self.style.trim().is_empty() {
            return Err(Error::Config("style cannot be empty".to_string()));
        }

        if self.runme_version.trim().is_empty() {
            return Err(Error::Config("runme_version cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Optional overrides for [`PreviewConfig`]; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    /// See [`PreviewConfig::runme_path`]
    pub runme_path: Option<PathBuf>,
    /// See [`PreviewConfig::install_path`]
    pub install_path: Option<PathBuf>,
    /// See [`PreviewConfig::runme_version`]
    pub runme_version: Option<String>,
    /// See [`PreviewConfig::width`]
    pub width: Option<u16>,
    /// See [`PreviewConfig::height`]
    pub height: Option<u16>,
    /// See [`PreviewConfig::width_ratio`]
    pub width_ratio: Option<f32>,
    /// See [`PreviewConfig::height_ratio`]
    pub height_ratio: Option<f32>,
    /// See [`PreviewConfig::style`]
    pub style: Option<String>,
    /// See [`PreviewConfig::pager`]
    pub pager: Option<bool>,
    /// See [`PreviewConfig::border`]
    pub border: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreviewConfig::default();
        assert_eq!(config.runme_path, None);
        assert_eq!(config.width, 100);
        assert_eq!(config.height, 100);
        assert_eq!(config.width_ratio, 0.7);
        assert_eq!(config.height_ratio, 0.7);
        assert_eq!(config.style, "dark");
        assert!(!config.pager);
        assert!(config.install_path.ends_with("runme-preview/bin"));
    }

    #[test]
    fn test_config_validation() {
        assert!(PreviewConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_ratio() {
        let mut config = PreviewConfig::default();
        config.width_ratio = 1.5;
        assert!(config.validate().is_err());

        config.width_ratio = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut config = PreviewConfig::default();
        config.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
runme_path: /usr/local/bin/runme
width: 120
height_ratio: 0.5
style: light
pager: true
"#;

        let config = PreviewConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.runme_path, Some(PathBuf::from("/usr/local/bin/runme")));
        assert_eq!(config.width, 120);
        assert_eq!(config.height, 100);
        assert_eq!(config.height_ratio, 0.5);
        assert_eq!(config.width_ratio, 0.7);
        assert_eq!(config.style, "light");
        assert!(config.pager);
    }

    #[test]
    fn test_empty_yaml_is_defaults() {
        let config = PreviewConfig::from_yaml("").unwrap();
        assert_eq!(config, PreviewConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = PreviewConfig::from_yaml("glow_path: /bin/glow\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = ConfigOverrides {
            style: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(PreviewConfig::default().merged(&overrides).is_err());
    }

    #[test]
    fn test_per_call_override_order() {
        let user = PreviewConfig::from_yaml("style: light\npager: true\n").unwrap();
        let per_call = ConfigOverrides {
            pager: Some(false),
            ..Default::default()
        };

        let config = user.merged(&per_call).unwrap();
        assert_eq!(config.style, "light");
        assert!(!config.pager);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.yaml");
        std::fs::write(&path, "border: rounded\n").unwrap();

        let config = PreviewConfig::from_file(&path).unwrap();
        assert_eq!(config.border, "rounded");
    }
}
