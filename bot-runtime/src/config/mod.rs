//! Bot configuration: YAML file, then environment overrides, then command-line overrides.
//!
//! Loaded once at startup and shared as `Arc<Config>`; never mutated afterwards.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notifier_core::{mask_token, NotifierError, Result};
use serde::Deserialize;
use tracing::debug;

#[cfg(test)]
mod tests;

/// Used when neither `--conf` nor `CONF_FILE` names a file.
pub const DEFAULT_CONFIG_PATH: &str = "ow-notifier.yaml";
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BIND_PORT: u16 = 5000;
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

const DEFAULT_SLEEP_INTERVAL_SECS: f64 = 5.0;
const DEFAULT_RETRY_DELAY_SECS: f64 = 60.0;
const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 30.0;
const DEFAULT_SHUTDOWN_GRACE_SECS: f64 = 10.0;
const DEFAULT_WATCHDOG_DELAY_SECS: f64 = 600.0;

/// Values taken from the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub development_mode: bool,
}

/// `telegram_chat_id` may be written as a YAML integer or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ChatIdValue {
    Int(i64),
    Str(String),
}

impl ChatIdValue {
    fn into_string(self) -> String {
        match self {
            ChatIdValue::Int(i) => i.to_string(),
            ChatIdValue::Str(s) => s,
        }
    }
}

/// Raw file contents; every key optional so missing keys are reported by name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    bind_host: Option<String>,
    bind_port: Option<u16>,
    graphql_endpoint: Option<String>,
    public_url: Option<String>,
    telegram_api_token: Option<String>,
    telegram_chat_id: Option<ChatIdValue>,
    telegram_api_url: Option<String>,
    telegram_webhook_secret: Option<String>,
    sleep_interval: Option<f64>,
    retry_delay: Option<f64>,
    request_timeout: Option<f64>,
    shutdown_grace_period: Option<f64>,
    watchdog_delay: Option<f64>,
}

/// Immutable runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub bind_host: String,
    pub bind_port: u16,
    /// GraphQL endpoint serving `activeAlerts`. Required.
    pub graphql_endpoint: String,
    /// Public base URL Telegram can reach; the webhook is registered only when set.
    pub public_url: Option<String>,
    /// Bot API credential. Required.
    pub telegram_api_token: String,
    /// Chat receiving alert notifications; notifications are dropped when unset.
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
    /// Sent to Telegram on registration and required on every webhook call when set.
    pub telegram_webhook_secret: Option<String>,
    pub development_mode: bool,
    pub sleep_interval: Duration,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub shutdown_grace_period: Duration,
    pub watchdog_delay: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_host", &self.bind_host)
            .field("bind_port", &self.bind_port)
            .field("graphql_endpoint", &alert_feed::redacted(&self.graphql_endpoint))
            .field("public_url", &self.public_url)
            .field("telegram_api_token", &mask_token(&self.telegram_api_token))
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_url", &self.telegram_api_url)
            .field(
                "telegram_webhook_secret",
                &self.telegram_webhook_secret.as_ref().map(|_| "***"),
            )
            .field("development_mode", &self.development_mode)
            .field("sleep_interval", &self.sleep_interval)
            .field("retry_delay", &self.retry_delay)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_grace_period", &self.shutdown_grace_period)
            .field("watchdog_delay", &self.watchdog_delay)
            .finish()
    }
}

impl Config {
    /// `--conf` / `CONF_FILE` if given, otherwise [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path(conf: Option<&Path>) -> PathBuf {
        conf.map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads and validates the config file, applying process environment and CLI overrides.
    pub fn load(path: &Path, overrides: &CliOverrides) -> Result<Self> {
        Self::load_with_env(path, overrides, |key| env::var(key).ok())
    }

    /// Like [`Config::load`] with an explicit environment lookup.
    pub fn load_with_env<E>(path: &Path, overrides: &CliOverrides, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        debug!(path = %path.display(), "Loading configuration");
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NotifierError::Config(format!("configuration file {} not found", path.display()))
            } else {
                NotifierError::Config(format!("cannot read {}: {}", path.display(), e))
            }
        })?;
        Self::from_yaml_str(&text, overrides, env)
    }

    /// Parses YAML text, applies overrides and validates.
    pub fn from_yaml_str<E>(yaml: &str, overrides: &CliOverrides, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = parse_file_config(yaml)?;
        // Empty environment values count as unset.
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let bind_port = match (overrides.port, env("BIND_PORT")) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .map_err(|_| NotifierError::Config(format!("BIND_PORT is not a port: {}", raw)))?,
            (None, None) => file.bind_port.unwrap_or(DEFAULT_BIND_PORT),
        };

        let config = Self {
            bind_host: overrides
                .host
                .clone()
                .or_else(|| env("BIND_HOST"))
                .or(file.bind_host)
                .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            bind_port,
            graphql_endpoint: env("GRAPHQL_ENDPOINT")
                .or(file.graphql_endpoint)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| missing_key("graphql_endpoint"))?,
            public_url: env("PUBLIC_URL").or(file.public_url),
            telegram_api_token: env("TELEGRAM_API_TOKEN")
                .or(file.telegram_api_token)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| missing_key("telegram_api_token"))?,
            telegram_chat_id: env("TELEGRAM_CHAT_ID")
                .or_else(|| file.telegram_chat_id.map(ChatIdValue::into_string)),
            telegram_api_url: env("TELEGRAM_API_URL")
                .or(file.telegram_api_url)
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            telegram_webhook_secret: file.telegram_webhook_secret,
            development_mode: overrides.development_mode,
            sleep_interval: seconds("sleep_interval", file.sleep_interval, DEFAULT_SLEEP_INTERVAL_SECS, false)?,
            retry_delay: seconds("retry_delay", file.retry_delay, DEFAULT_RETRY_DELAY_SECS, false)?,
            request_timeout: seconds("request_timeout", file.request_timeout, DEFAULT_REQUEST_TIMEOUT_SECS, false)?,
            shutdown_grace_period: seconds(
                "shutdown_grace_period",
                file.shutdown_grace_period,
                DEFAULT_SHUTDOWN_GRACE_SECS,
                false,
            )?,
            watchdog_delay: seconds("watchdog_delay", file.watchdog_delay, DEFAULT_WATCHDOG_DELAY_SECS, true)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks URLs and the webhook secret format. Called by every constructor.
    pub fn validate(&self) -> Result<()> {
        let endpoint = reqwest::Url::parse(&self.graphql_endpoint).map_err(|_| {
            NotifierError::Config(format!(
                "graphql_endpoint is not a valid URL: {}",
                alert_feed::redacted(&self.graphql_endpoint)
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(NotifierError::Config(format!(
                "graphql_endpoint must be http or https, got {}",
                endpoint.scheme()
            )));
        }
        if reqwest::Url::parse(&self.telegram_api_url).is_err() {
            return Err(NotifierError::Config(format!(
                "telegram_api_url is not a valid URL: {}",
                self.telegram_api_url
            )));
        }
        if let Some(ref url) = self.public_url {
            if reqwest::Url::parse(url).is_err() {
                return Err(NotifierError::Config(format!(
                    "public_url is not a valid URL: {}",
                    url
                )));
            }
        }
        if let Some(ref secret) = self.telegram_webhook_secret {
            // Telegram accepts 1-256 characters from A-Z, a-z, 0-9, _ and -.
            let valid = !secret.is_empty()
                && secret.len() <= 256
                && secret
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(NotifierError::Config(
                    "telegram_webhook_secret must be 1-256 characters of A-Z, a-z, 0-9, _ or -"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    /// `host:port` the webhook server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    /// Full URL Telegram should deliver updates to, when `public_url` is set.
    pub fn webhook_url(&self) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|base| format!("{}/telegram-webhook", base.trim_end_matches('/')))
    }
}

fn parse_file_config(yaml: &str) -> Result<FileConfig> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)
        .map_err(|e| NotifierError::Config(format!("invalid YAML: {}", e)))?;
    match value {
        serde_yaml::Value::Null => Ok(FileConfig::default()),
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value)
            .map_err(|e| NotifierError::Config(format!("invalid configuration: {}", e))),
        _ => Err(NotifierError::Config(
            "configuration must be a YAML mapping".to_string(),
        )),
    }
}

fn missing_key(key: &str) -> NotifierError {
    NotifierError::Config(format!("missing required key `{}`", key))
}

fn seconds(key: &str, value: Option<f64>, default: f64, allow_zero: bool) -> Result<Duration> {
    let secs = value.unwrap_or(default);
    let in_range = secs.is_finite() && (secs > 0.0 || (allow_zero && secs == 0.0));
    if !in_range {
        return Err(NotifierError::Config(format!(
            "`{}` must be a positive number of seconds, got {}",
            key, secs
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| {
        NotifierError::Config(format!("`{}` is out of range ({} seconds): {}", key, secs, e))
    })
}
