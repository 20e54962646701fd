//! `sqlport.toml` configuration.
//!
//! ```toml
//! workers = 8
//! queue_capacity = 512
//! unrecognized = "report"
//! parallel = true
//! ```
//!
//! Lookup order: an explicit path, `./sqlport.toml`, then
//! `<config dir>/sqlport/config.toml`. Missing keys take built-in defaults;
//! command-line flags override whatever was loaded.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConvertError, ConvertResult};
use crate::parser::UnrecognizedPolicy;
use crate::pool::DEFAULT_QUEUE_CAPACITY;

pub const CONFIG_FILE: &str = "sqlport.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Worker tasks for parallel parsing.
    pub workers: usize,
    /// Bound of the pool's work and result queues.
    pub queue_capacity: usize,
    pub unrecognized: UnrecognizedPolicy,
    /// Parse with the worker pool instead of sequentially.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            unrecognized: UnrecognizedPolicy::Skip,
            parallel: false,
        }
    }
}

impl Config {
    /// Parse configuration text.
    pub fn from_toml(content: &str) -> ConvertResult<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConvertError::Config(e.to_string()))?;
        if config.workers == 0 {
            return Err(ConvertError::Config("workers must be at least 1".into()));
        }
        if config.queue_capacity == 0 {
            return Err(ConvertError::Config("queue_capacity must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConvertResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load from `explicit`, or the first config file found, or defaults.
    ///
    /// An explicit path that does not exist is an error; the implicit
    /// locations are optional.
    pub fn load(explicit: Option<&Path>) -> ConvertResult<Self> {
        if let Some(path) = explicit {
            debug!("Loading config from {}", path.display());
            return Self::from_file(path);
        }
        for path in Self::search_paths() {
            if path.is_file() {
                debug!("Loading config from {}", path.display());
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sqlport").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_toml("workers = 3\nunrecognized = \"report\"").unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.unrecognized, UnrecognizedPolicy::Report);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(!config.parallel);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Config::from_toml("workers = 0"), Err(ConvertError::Config(_))));
        assert!(matches!(Config::from_toml("threads = 2"), Err(ConvertError::Config(_))));
        assert!(matches!(
            Config::from_toml("unrecognized = \"panic\""),
            Err(ConvertError::Config(_))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "parallel = true\nqueue_capacity = 16").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.parallel);
        assert_eq!(config.queue_capacity, 16);

        let missing = file.path().with_extension("absent");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
