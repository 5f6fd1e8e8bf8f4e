//! Application configuration management.
//!
//! Settings are layered with figment: built-in defaults, then the
//! `config.toml` in the platform config directory, then `DUPEFINDER_*`
//! environment variables. Command-line flags are applied on top by the
//! caller.

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPEFINDER_";

/// Persistent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Comparison chunk size in bytes. `None` uses the default, `0` is adaptive.
    #[serde(default)]
    pub chunk_size: Option<u64>,
    /// Where the run log and export files go.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Colored console output.
    #[serde(default = "default_color")]
    pub color: bool,
    /// Include zero-length files in the scan.
    #[serde(default)]
    pub include_empty: bool,
}

fn default_color() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: None,
            output_dir: None,
            color: true,
            include_empty: false,
        }
    }
}

impl Settings {
    /// Load settings from the default platform-specific path and the
    /// environment. Falls back to defaults on any error.
    pub fn load() -> Self {
        let path = Self::config_path().ok();
        match Self::figment(path.as_deref()).extract() {
            Ok(settings) => settings,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// The layered figment: defaults < TOML file (if given) < environment.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// The configured output directory, or the platform default.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(default_output_dir)
    }

    /// Get the default platform-specific configuration path.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = project_dirs()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "dupefinder", "dupefinder")
}

/// Default directory for run logs: the platform local data dir, or the
/// system temp dir when that cannot be determined.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_local_dir().join("logs"),
        None => std::env::temp_dir().join("dupefinder"),
    }
}
