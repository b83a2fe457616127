//! Configuration file loading with defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const FILE_NAME: &str = "config.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Network
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_wait_time")]
    pub retry_wait_time: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // Output
    #[serde(default = "default_save_path")]
    pub save_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_wait_time: default_retry_wait_time(),
            user_agent: default_user_agent(),
            save_path: default_save_path(),
        }
    }
}

fn default_max_workers() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_wait_time() -> u64 {
    5
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120 Safari/537.36"
        .to_string()
}

fn default_save_path() -> String {
    "downloaded_epubs".to_string()
}

/// Load the config file, creating it with defaults when it does not exist.
///
/// Missing fields fall back to their defaults via serde, so upgrading across
/// versions never fails on an older file.
pub fn load_or_create(config_path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(FILE_NAME));

    if !path.exists() {
        let config = Config::default();
        write_default(&config, &path)?;
        return Ok(config);
    }

    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
}

fn write_default(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;
    let contents = format!("# epub-downloader configuration\n{yaml}");
    fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let cfg = load_or_create(Some(&path)).unwrap();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_wait_time, 5);
        assert!(path.exists());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "save_path: out\n").unwrap();
        let cfg = load_or_create(Some(&path)).unwrap();
        assert_eq!(cfg.save_path, "out");
        assert_eq!(cfg.max_workers, 4);
    }

    #[test]
    fn rejects_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "max_retries: [not a number\n").unwrap();
        assert!(matches!(
            load_or_create(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
