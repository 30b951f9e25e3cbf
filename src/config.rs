//! Filter configuration.
//!
//! Pandoc starts filters with no user arguments, so the configuration comes
//! from a TOML file: an explicit path (`--config` or
//! `PANDOC_SOURCE_EXEC_CONFIG`), or the first of [`CONFIG_FILES`] found
//! walking up from the working directory. The walk stops at the directory
//! holding `.git`. No file means defaults.
//!
//! ```toml
//! search-root = "."
//! timeout = 0
//! output-class = "output"
//! label-prefix = "cl:"
//!
//! [interpreters]
//! python = "python3.12 -c"
//! lua = "lua -e"
//!
//! [plot]
//! width = "6cm"
//! height = "4cm"
//! dir = "source-exec-plots"
//! format = "png"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Config file names, in order of precedence within one directory.
pub const CONFIG_FILES: &[&str] = &[".pandoc-source-exec.toml", "pandoc-source-exec.toml"];

/// Environment variable holding an explicit config path.
pub const CONFIG_ENV: &str = "PANDOC_SOURCE_EXEC_CONFIG";

const MAX_DEPTH: usize = 100;

pub const DEFAULT_PLOT_WIDTH: &str = "6cm";
pub const DEFAULT_PLOT_HEIGHT: &str = "4cm";

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config file at {path}: {source}")]
    ParseError { source: toml::de::Error, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Root of the `file=` search (default: working directory)
    pub search_root: Option<PathBuf>,

    /// Milliseconds per interpreter run, 0 waits forever
    pub timeout: u64,

    /// Class given to the code block holding captured output
    pub output_class: String,

    /// Prefix of generated listing labels
    pub label_prefix: String,

    /// Per-language commands, overriding the built-in table
    pub interpreters: BTreeMap<String, String>,

    pub plot: PlotConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_root: None,
            timeout: 0,
            output_class: "output".to_string(),
            label_prefix: "cl:".to_string(),
            interpreters: BTreeMap::new(),
            plot: PlotConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PlotConfig {
    /// Width used when a block gives none
    pub width: String,

    /// Height used when a block gives none
    pub height: String,

    /// Directory receiving the images
    pub dir: PathBuf,

    /// Image extension; unset picks `pdf` for LaTeX and `png` otherwise
    pub format: Option<String>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_PLOT_WIDTH.to_string(),
            height: DEFAULT_PLOT_HEIGHT.to_string(),
            dir: PathBuf::from("source-exec-plots"),
            format: None,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::ParseError {
            source,
            path: path.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            source,
            path: path_str.clone(),
        })?;
        Self::from_toml(&content, &path_str)
    }

    /// Loads the explicit file, or a discovered one, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::debug!("[source-exec-config] Using config file: {}", path.display());
            return Self::from_file(path);
        }
        let start = match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                log::debug!("[source-exec-config] Failed to get current directory: {e}");
                return Ok(Self::default());
            }
        };
        match discover_config_upward(&start) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Directory the File Resolver searches.
    pub fn search_root(&self) -> PathBuf {
        self.search_root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Finds the nearest config file at or above `start_dir`, stopping at the
/// directory that contains `.git`.
pub fn discover_config_upward(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    for _ in 0..MAX_DEPTH {
        log::debug!("[source-exec-config] Searching for config in: {}", current.display());
        for name in CONFIG_FILES {
            let candidate = current.join(name);
            if candidate.is_file() {
                log::debug!("[source-exec-config] Found config file: {}", candidate.display());
                return Some(candidate);
            }
        }
        if current.join(".git").exists() {
            log::debug!("[source-exec-config] Stopping at .git directory");
            return None;
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
    log::debug!("[source-exec-config] Maximum traversal depth reached");
    None
}
