use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Environment variable selecting the deployment mode.
pub const MODE_VAR: &str = "APP_ENV";

/// Name prefix for parameter and secret lookups in production.
pub const PREFIX_VAR: &str = "CONFIG_VAR_PREFIX";

/// Where configuration values are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Plain environment variables.
    Development,
    /// Parameter store and secret store under `CONFIG_VAR_PREFIX`.
    Production,
}

impl DeploymentMode {
    /// Production only when the value is `production`, ignoring case and
    /// surrounding whitespace.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var(MODE_VAR).ok().as_deref())
    }

    /// The remote lookup prefix. Only production reads it, and there it
    /// must be set.
    pub fn config_prefix(self) -> Result<String> {
        match self {
            Self::Production => Ok(std::env::var(PREFIX_VAR)?),
            Self::Development => Ok(String::new()),
        }
    }
}

/// Tunables read from an optional TOML file. Every field has a default, so
/// a missing file is not an error.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub retry_delay_secs: u32,
    pub stats_key: String,
    pub notify_base_url: String,
    pub sms_metric_platform: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry_delay_secs: 30,
            stats_key: "stats.json".to_string(),
            notify_base_url: "https://api.notifications.service.gov.uk".to_string(),
            sms_metric_platform: "lambda".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }
}
