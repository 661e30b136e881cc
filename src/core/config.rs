use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::core::execution::{PollFailurePolicy, WatcherSettings};

pub const CONFIG_ENV: &str = "CREWDECK_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrewdeckConfig {
    /// Base URL of the crew backend.
    pub api_url: String,

    pub poll_interval_ms: u64,

    /// Consecutive poll failures tolerated before a watch is failed.
    /// 1 means the first failure is final.
    pub max_poll_failures: u32,

    pub request_timeout_secs: u64,
}

impl Default for CrewdeckConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            poll_interval_ms: 3_000,
            max_poll_failures: 1,
            request_timeout_secs: 30,
        }
    }
}

impl CrewdeckConfig {
    /// Load from `explicit`, then `$CREWDECK_CONFIG`, then the user config dir.
    /// An explicitly named file must exist; the default location may be absent.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (Some(path.to_path_buf()), true),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => (Some(PathBuf::from(path)), true),
                None => (default_config_path(), false),
            },
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            if required {
                return Err(anyhow!("config file {} not found", path.display()));
            }
            info!("No config at {}, using defaults.", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config =
            Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))?;
        info!(
            "Loaded config from {}: api_url={}, poll_interval={}ms, max_poll_failures={}",
            path.display(),
            config.api_url,
            config.poll_interval_ms,
            config.max_poll_failures
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CrewdeckConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: &str) -> Result<Self> {
        self.api_url = api_url.to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| anyhow!("api_url '{}' is not a valid URL: {}", self.api_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("api_url must be http or https, got '{}'", url.scheme()));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be at least 1"));
        }
        if self.max_poll_failures == 0 {
            return Err(anyhow!("max_poll_failures must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn watcher_settings(&self) -> WatcherSettings {
        WatcherSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            failure_policy: PollFailurePolicy::from_max_failures(self.max_poll_failures),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("crewdeck").join("config.toml"))
}
