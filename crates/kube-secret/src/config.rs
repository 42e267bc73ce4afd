//! Configuration for kube-secret
//!
//! Config file lookup, first match wins:
//! - `--config <path>` on the command line
//! - `$KUBE_SECRET_CONFIG`
//! - `~/.config/kube-secret/config.yaml`
//!
//! A missing file means defaults. Every key is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "KUBE_SECRET_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Editor used when neither KUBE_EDITOR nor EDITOR is set
    #[serde(default = "default_editor")]
    pub editor: String,

    /// Where `edit` puts its decoded temp file (system temp dir if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Keep the decoded temp file around when an edit can't be saved
    #[serde(default = "default_keep_failed_edits")]
    pub keep_failed_edits: bool,
}

fn default_editor() -> String {
    "vi".to_string()
}

fn default_keep_failed_edits() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: default_editor(),
            temp_dir: None,
            keep_failed_edits: default_keep_failed_edits(),
        }
    }
}

impl Config {
    /// Default config location (~/.config/kube-secret/config.yaml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kube-secret").join("config.yaml"))
    }

    /// Load from an explicit path, the env override, or the default location
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(Self::default_path);

        match path {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        Ok(config)
    }
}
