use crate::planner::DEFAULT_EXTENSIONS;
use crate::{DEFAULT_SUBFOLDER_TEMPLATE, DEFAULT_TEMPLATE};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub template: String,
    pub subfolder_template: String,
    pub extensions: Vec<String>,
    pub use_subfolders: bool,
    pub exiftool_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            subfolder_template: DEFAULT_SUBFOLDER_TEMPLATE.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            use_subfolders: false,
            exiftool_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("org", "raw-sorter", "raw-sorter")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

/// Reads the user config, falling back to defaults when none exists.
pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        debug!(path = %paths.config_path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read config file: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("could not parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_config_keeps_defaults_for_missing_keys() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "use_subfolders = true\nextensions = [\"CR3\", \"DNG\"]\n",
        )
        .expect("write config");

        let config = load_config_from(&path).expect("config should parse");
        assert!(config.use_subfolders);
        assert_eq!(config.extensions, vec!["CR3", "DNG"]);
        assert_eq!(config.template, DEFAULT_TEMPLATE);
        assert_eq!(config.subfolder_template, DEFAULT_SUBFOLDER_TEMPLATE);
        assert_eq!(config.exiftool_path, None);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = AppConfig {
            exiftool_path: Some(PathBuf::from("/usr/local/bin/exiftool")),
            ..AppConfig::default()
        };
        let body = toml::to_string_pretty(&config).expect("serialize");
        let parsed = toml::from_str::<AppConfig>(&body).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn broken_config_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "use_subfolders = \"maybe\"\n").expect("write config");

        let err = load_config_from(&path).expect_err("must fail");
        assert!(err.to_string().contains("could not parse config file"));
    }
}
