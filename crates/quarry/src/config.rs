//! Connection configuration loading and validation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_exec_timeout_secs() -> u64 {
    5
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Connection URL. The scheme selects the driver
    /// (`sqlite:...`, `mysql://...`).
    pub url: String,

    /// Maximum pool size (default: 10).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Timeout for acquiring a pooled connection, in seconds (default: 30).
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Wall-clock timeout for create/update/delete, in seconds (default: 5).
    /// Reads run unbounded.
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
}

impl DbConfig {
    /// Create a configuration with default tuning for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            exec_timeout_secs: default_exec_timeout_secs(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: DbConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::Config("url is required".into()));
        }
        let scheme = self.url.split(':').next().unwrap_or("");
        if !matches!(scheme, "sqlite" | "mysql") {
            return Err(Error::Config(format!(
                "Unsupported database URL scheme: '{scheme}'. Supported schemes: sqlite, mysql"
            )));
        }
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".into()));
        }
        if self.exec_timeout_secs == 0 {
            return Err(Error::Config("exec_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Pool acquire timeout as a [`Duration`].
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Write-operation timeout as a [`Duration`].
    #[must_use]
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    pub(crate) fn default_exec_timeout() -> Duration {
        Duration::from_secs(default_exec_timeout_secs())
    }
}
