//! Configuration handling for thisify.
//!
//! Options for the command come from a `thisify.toml` file:
//!
//! ```toml
//! [insert_this]
//! qualifier = "this"
//! separator = "."
//! fields = true
//! methods = true
//! class_boundary = "name"   # or "declaration"
//! ```
//!
//! Every key is optional. A missing file means defaults; a file that cannot
//! be read or parsed is an error. Command-line flags are applied on top by
//! the caller.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use thisify_java::ops::InsertThisOptions;
use tracing::debug;

/// File looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "thisify.toml";

/// Thisify configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Options for the "Insert This" command
    #[serde(default)]
    pub insert_this: InsertThisOptions,
}

/// A configuration file that exists but is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `thisify.toml` from `dir`, or defaults when there is none.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }
}
