//! Application configuration management.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform configuration directory
//!    (or the file given with `--config`)
//! 3. `DEDUPIFY_*` environment variables (e.g. `DEDUPIFY_IO_THREADS=8`)
//! 4. Command-line flags, applied by the caller

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::select::KeepPolicy;
use crate::duplicates::SortKey;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "DEDUPIFY_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads for each hashing stage.
    pub io_threads: usize,
    /// Directory names pruned in addition to the built-in denylist.
    pub extra_ignored_dirs: Vec<String>,
    /// Minimum time between two progress messages.
    pub progress_interval_ms: u64,
    /// Copy to keep when selecting automatically; `None` only lists results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep: Option<KeepPolicy>,
    /// Order groups are shown in.
    pub sort: SortKey,
    /// Re-check size and modification time before moving a file.
    pub verify_before_delete: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 4,
            extra_ignored_dirs: Vec::new(),
            progress_interval_ms: 100,
            keep: None,
            sort: SortKey::Size,
            verify_before_delete: true,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    ///
    /// A missing file is not an error. An unreadable or invalid one logs a
    /// warning and yields the defaults.
    #[must_use]
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_from_path(path),
            Err(e) => {
                log::debug!("No configuration directory ({}), using defaults", e);
                Self::load_layers(Self::figment().merge(Self::env()))
            }
        }
    }

    /// Load the configuration from an explicit TOML file.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            log::debug!("Loading configuration from {}", path.display());
        } else {
            log::debug!("Configuration file {} not found", path.display());
        }
        Self::load_layers(Self::figment().merge(Toml::file(path)).merge(Self::env()))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX)
    }

    fn load_layers(figment: Figment) -> Self {
        match figment.extract::<Config>() {
            Ok(config) => config.normalized(),
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn normalized(mut self) -> Self {
        self.io_threads = self.io_threads.max(1);
        self
    }

    /// Progress interval as a [`Duration`].
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no home directory.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "dedupify", "dedupify")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}
