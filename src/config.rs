//! Archive configuration loaded from `shoebox.toml`.
//!
//! All fields have defaults; a config file only needs the keys it wants
//! to override. Unknown keys are rejected so typos fail loudly instead of
//! silently falling back to defaults. CLI flags override file values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default name of the config file, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "shoebox.toml";

/// Archive configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShoeboxConfig {
    /// Store location settings.
    pub store: StoreSection,
    /// Sync pipeline settings.
    pub sync: SyncSection,
}

/// Store location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Archive base directory. Everything lives under it: `by_sha/`,
    /// `by_date/`, `by_tag/`.
    pub root: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            root: "archive".to_string(),
        }
    }
}

/// Sync pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    /// Emit a progress notice every N ingested items.
    pub progress_every: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            progress_every: 100,
        }
    }
}

impl ShoeboxConfig {
    /// The store base directory as a path.
    pub fn root(&self) -> &Path {
        Path::new(&self.store.root)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.root.is_empty() {
            return Err(ConfigError::Validation(
                "store.root must not be empty".into(),
            ));
        }
        if self.sync.progress_every == 0 {
            return Err(ConfigError::Validation(
                "sync.progress_every must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration.
///
/// With an explicit path the file must exist and parse. Without one,
/// `shoebox.toml` in the working directory is used if present; otherwise
/// stock defaults apply. The result is always validated.
pub fn load_config(explicit: Option<&Path>) -> Result<ShoeboxConfig, ConfigError> {
    let config = match explicit {
        Some(path) => parse_file(path)?,
        None => {
            let default_path = PathBuf::from(CONFIG_FILENAME);
            if default_path.exists() {
                parse_file(&default_path)?
            } else {
                ShoeboxConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<ShoeboxConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Returns a fully-commented stock `shoebox.toml` with all keys documented.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Shoebox Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as `shoebox.toml` in the directory you run shoebox
# from, or pass an explicit path with `--config`. CLI flags override
# file values. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Store location
# ---------------------------------------------------------------------------
[store]
# Archive base directory. The canonical tree (by_sha/), the date index
# (by_date/) and the tag index (by_tag/) all live under it.
root = "archive"

# ---------------------------------------------------------------------------
# Sync pipeline
# ---------------------------------------------------------------------------
[sync]
# Emit a progress notice every N ingested items.
progress_every = 100
"##
}
