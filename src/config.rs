// Client configuration: YAML file, then environment overrides

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const ENV_BASE_URL: &str = "NOTESTORE_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "NOTESTORE_TIMEOUT_MS";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend root, without trailing slash (e.g. "http://localhost:8000")
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: format!("notestore/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Default location: `$CONFIG_DIR/notestore/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("notestore").join("config.yaml"))
    }

    /// Load from `path` (or the default location), then apply environment overrides.
    ///
    /// A missing file at the default location is not an error; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.normalize();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        debug!(path = ?path, "Loaded config file");
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw
                .trim()
                .parse()
                .map_err(|_| eyre!("{} must be an integer, got {:?}", ENV_TIMEOUT_MS, raw))?;
        }
        Ok(())
    }

    fn normalize(&mut self) {
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.normalize();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
