//! Configuration for bronto-connect
//!
//! Loaded from a JSON or YAML file. `${VAR}` and `${VAR:-default}` are
//! expanded from the environment before parsing, so the token can live
//! outside the file:
//!
//! ```yaml
//! start_date: "2020-01-01T00:00:00Z"
//! token: ${BRONTO_TOKEN}
//! state_path: ./state.json
//! retry:
//!   max_timeout_retries: 5
//! ```

use crate::session::MAX_PAGE_SIZE;
use crate::sync::EngineSettings;
use crate::traits::record::parse_timestamp;
use crate::traits::retry::RetryConfig;
use crate::types::SensitiveString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Pattern: ${VAR} or ${VAR:-default}
static ENV_VAR_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var regex pattern is invalid")
});

/// Top-level connector configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConnectConfig {
    /// Where syncs start without a checkpoint, and always for `FULL_TABLE`
    #[serde(default = "default_start_date")]
    #[validate(custom(function = "validate_start_date"))]
    pub start_date: String,

    /// API token used to log in
    pub token: SensitiveString,

    /// File the checkpoint is rewritten to after every window
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 5000))]
    pub page_size: u32,

    #[serde(default)]
    #[validate(nested)]
    pub retry: RetrySettings,
}

/// Retry behavior for timed-out requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RetrySettings {
    /// Consecutive timeouts tolerated for one request
    #[serde(default = "default_max_timeout_retries")]
    #[validate(range(max = 100))]
    pub max_timeout_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    #[validate(range(min = 1))]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_timeout_retries: default_max_timeout_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig::new()
            .with_max_retries(settings.max_timeout_retries)
            .with_initial_delay(Duration::from_millis(settings.initial_delay_ms))
            .with_max_delay(Duration::from_millis(settings.max_delay_ms))
    }
}

fn default_start_date() -> String {
    "2017-01-01T00:00:00Z".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_timeout_retries() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn validate_start_date(value: &str) -> Result<(), ValidationError> {
    match parse_timestamp(value) {
        Some(_) => Ok(()),
        None => {
            let mut err = ValidationError::new("start_date");
            err.message = Some(format!("'{}' is not a valid timestamp", value).into());
            Err(err)
        }
    }
}

impl ConnectConfig {
    /// Load configuration from a JSON or YAML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        Self::from_str_expanded(&content)
    }

    /// Parse configuration text after expanding environment variables
    pub fn from_str_expanded(content: &str) -> anyhow::Result<Self> {
        let expanded = Self::expand_env_vars(content);

        let config: Self = serde_yaml::from_str(&expanded)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        config.check()?;
        Ok(config)
    }

    /// Expand environment variables in the format ${VAR} or ${VAR:-default}
    fn expand_env_vars(content: &str) -> String {
        ENV_VAR_REGEX
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                let default = caps.get(2).map(|m| m.as_str());

                std::env::var(var_name).unwrap_or_else(|_| default.unwrap_or("").to_string())
            })
            .to_string()
    }

    /// Validate field constraints and required values
    pub fn check(&self) -> anyhow::Result<()> {
        if self.token.is_empty() {
            anyhow::bail!("Config must have a non-empty 'token'");
        }
        self.validate()
            .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
        Ok(())
    }

    /// Engine settings derived from this config
    pub fn engine_settings(&self) -> anyhow::Result<EngineSettings> {
        let start_date = parse_timestamp(&self.start_date)
            .ok_or_else(|| anyhow::anyhow!("Invalid start_date '{}'", self.start_date))?;
        Ok(EngineSettings {
            start_date,
            page_size: self.page_size,
            retry: RetryConfig::from(&self.retry),
        })
    }
}
