// src/config.rs

//! Storage locations and write options
//!
//! All persistent metadata lives below `<root_dir>/<meta_path>`:
//!
//! - `<meta_path>/<registry_file>`: the installed-packages registry
//! - `<meta_path>/metadata/<pkgname>/<plist>`: per-package metadata plists

use crate::codec::Encoding;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default metadata directory, relative to the root directory
pub const DEFAULT_META_PATH: &str = "var/db/xbps";

/// Default registry file name
pub const DEFAULT_REGISTRY_FILE: &str = "regpkgdb.plist";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory everything else is relative to
    pub root_dir: PathBuf,

    /// Metadata directory, relative to `root_dir`
    pub meta_path: PathBuf,

    /// Registry file name inside the metadata directory
    pub registry_file: String,

    /// Gzip plist files when writing them back
    pub compress_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("/"),
            meta_path: PathBuf::from(DEFAULT_META_PATH),
            registry_file: DEFAULT_REGISTRY_FILE.to_string(),
            compress_on_write: false,
        }
    }
}

impl Config {
    /// Default configuration rooted at `root_dir`
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Absolute metadata directory
    pub fn meta_dir(&self) -> PathBuf {
        self.root_dir.join(&self.meta_path)
    }

    /// Path of the installed-packages registry
    pub fn registry_path(&self) -> PathBuf {
        self.meta_dir().join(&self.registry_file)
    }

    /// Path of a per-package metadata plist
    pub fn metadata_plist_path(&self, pkgname: &str, plist: &str) -> PathBuf {
        self.meta_dir().join("metadata").join(pkgname).join(plist)
    }

    /// Encoding used when writing plist files
    pub fn write_encoding(&self) -> Encoding {
        if self.compress_on_write {
            Encoding::Gzip
        } else {
            Encoding::Plain
        }
    }
}
