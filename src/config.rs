//! Monitor configuration loading: JSON file, built-in defaults and environment overrides.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{error::ConfigError, services::supervisor::Backoff};

/// Default location on disk where the binary looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/health.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CONSULT_HEALTH_CONFIG_PATH";
/// Local development backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

const BACKEND_URL_ENV: &str = "HEALTH_BACKEND_URL";
const POLL_INTERVAL_ENV: &str = "HEALTH_POLL_INTERVAL_MS";
const AUTO_CHECK_ENV: &str = "HEALTH_AUTO_CHECK";

/// Settings recognized by [`HealthMonitor`](crate::monitor::HealthMonitor).
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Run one check as soon as the monitor is created.
    pub auto_check_on_start: bool,
    /// Base URL of the backend; checks hit `{backend_url}/health`.
    pub backend_url: String,
    /// Delay between the end of one check and the start of the next. Zero disables polling.
    pub poll_interval: Duration,
    /// Caller-level backoff applied by the supervisor after failed checks.
    pub failure_backoff: Option<Backoff>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            auto_check_on_start: false,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: Duration::ZERO,
            failure_backoff: None,
        }
    }
}

impl MonitorConfig {
    /// Construct a configuration targeting `backend_url` with every other setting defaulted.
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            ..Self::default()
        }
    }

    /// Check once on creation and then poll every `interval` after each completed check.
    pub fn with_polling(mut self, interval: Duration) -> Self {
        self.auto_check_on_start = true;
        self.poll_interval = interval;
        self
    }

    /// Load the configuration file, then apply environment overrides.
    ///
    /// A missing or broken file never fails the load: the built-in defaults are used instead.
    pub fn load() -> Self {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same as [`MonitorConfig::load`] with variables resolved through `lookup`.
    pub fn load_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = resolve_config_path(&lookup);
        let config = match Self::from_file(&path) {
            Ok(config) => {
                info!(path = %path.display(), "loaded health monitor config");
                config
            }
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to load config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_overrides(lookup)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = serde_json::from_str::<RawConfig>(&contents).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        raw.try_into()
    }

    /// Apply overrides looked up through `lookup`, ignoring (and logging) unusable values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.backend_url = url;
        }

        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            match parse_millis(POLL_INTERVAL_ENV, &raw) {
                Ok(interval) => self.poll_interval = interval,
                Err(err) => warn!(error = %err, "ignoring poll interval override"),
            }
        }

        if let Some(raw) = lookup(AUTO_CHECK_ENV) {
            match parse_flag(AUTO_CHECK_ENV, &raw) {
                Ok(flag) => self.auto_check_on_start = flag,
                Err(err) => warn!(error = %err, "ignoring auto check override"),
            }
        }

        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    auto_check_on_start: bool,
    #[serde(default)]
    backend_url: Option<String>,
    #[serde(default)]
    poll_interval_ms: u64,
    #[serde(default)]
    failure_backoff: Option<RawBackoff>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBackoff {
    initial_ms: u64,
    max_ms: u64,
}

impl TryFrom<RawConfig> for MonitorConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let failure_backoff = match value.failure_backoff {
            Some(raw) if raw.initial_ms == 0 => {
                return Err(ConfigError::InvalidValue {
                    key: "failureBackoff.initialMs",
                    value: raw.initial_ms.to_string(),
                });
            }
            Some(raw) => Some(Backoff::new(
                Duration::from_millis(raw.initial_ms),
                Duration::from_millis(raw.max_ms),
            )),
            None => None,
        };

        Ok(Self {
            auto_check_on_start: value.auto_check_on_start,
            backend_url: value
                .backend_url
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            poll_interval: Duration::from_millis(value.poll_interval_ms),
            failure_backoff,
        })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(CONFIG_PATH_ENV)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
