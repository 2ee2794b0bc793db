use crate::error::BddError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Url waits keep their own bound; `timeout_ms` does not apply to them.
pub const URL_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BddConfig {
    /// Upper bound for selector, text and visibility waits.
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub capture_dir: PathBuf,
    /// Element searched by `click_the_label`.
    pub label_tag: String,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            capture_dir: PathBuf::from("./capture"),
            label_tag: "a".to_string(),
        }
    }
}

impl BddConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, BddError> {
        let config: BddConfig =
            toml::from_str(source).map_err(|err| BddError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, BddError> {
        let content = fs::read_to_string(path).map_err(|source| BddError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<(), BddError> {
        if self.timeout_ms == 0 {
            return Err(BddError::Config("timeout_ms must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(BddError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.label_tag.trim().is_empty() {
            return Err(BddError::Config("label_tag cannot be empty".to_string()));
        }
        Ok(())
    }
}
