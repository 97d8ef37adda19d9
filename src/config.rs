//! Configuration file support.
//!
//! Loads optional settings from a TOML file and resolves the directory the
//! databases live in.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::DbboxError;
use crate::formatter::OutputFormat;

/// Directory name used under the platform config and data directories.
pub const APP_NAME: &str = "dbbox";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "DBBOX_DATA_DIR";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DbboxConfig {
    /// Where database files are stored. Defaults to the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Format used by `--read` when no format flag is given.
    #[serde(default)]
    pub output_format: Option<String>,
}

impl DbboxConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads `<config_dir>/dbbox/config.toml`, or defaults when it is absent.
    pub fn load_default() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_NAME).join("config.toml"))
    }

    /// Picks the data directory: explicit override, then config file, then platform default.
    pub fn resolve_data_dir(&self, overridden: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = overridden {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        default_data_dir().ok_or_else(|| {
            DbboxError::Config("could not determine the platform data directory".to_string())
                .into()
        })
    }

    /// The read format named by `output_format`, or the table format.
    pub fn default_format(&self) -> crate::Result<OutputFormat> {
        match &self.output_format {
            Some(name) => name
                .parse()
                .map_err(|e| DbboxError::Config(format!("output_format: {e}"))),
            None => Ok(OutputFormat::Table),
        }
    }
}

/// `~/.local/share/dbbox`, `~/Library/Application Support/dbbox` or `%APPDATA%\dbbox`.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}
