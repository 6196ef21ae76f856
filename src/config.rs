//! Environment-driven configuration for the API client, the dashboard
//! server and logging. Unparsable numbers and flags keep their defaults;
//! an unusable URL or address is an error.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::fetch::RetryPolicy;
use crate::observability::{LogFormat, LoggingConfig};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/";
pub const DEFAULT_DASHBOARD_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: 15_000,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API base URL '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("API base URL '{0}' cannot carry a path")]
    BaseUrlNotHierarchical(String),
    #[error("HTTP client build error: {0}")]
    HttpClientBuild(String),
    #[error("invalid dashboard address '{value}': {source}")]
    InvalidAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

pub fn api_config_from_env() -> Result<ApiConfig, ConfigError> {
    let mut config = ApiConfig::default();

    if let Ok(raw) = env::var("COMISSOES_API_BASE_URL") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.base_url = parse_base_url(trimmed)?.to_string();
        }
    }

    if let Some(timeout_ms) = env_number::<u64>("COMISSOES_HTTP_TIMEOUT_MS") {
        config.timeout_ms = timeout_ms;
    }

    if let Some(retries) = env_number::<u32>("COMISSOES_HTTP_RETRIES") {
        config.retry.retries = retries;
    }

    if let Some(step_ms) = env_number::<u64>("COMISSOES_HTTP_BACKOFF_MS") {
        config.retry.backoff_step_ms = step_ms;
    }

    Ok(config)
}

pub fn dashboard_addr_from_env() -> Result<SocketAddr, ConfigError> {
    let raw = env::var("COMISSOES_DASHBOARD_ADDR")
        .unwrap_or_else(|_| DEFAULT_DASHBOARD_ADDR.to_string());
    raw.trim()
        .parse()
        .map_err(|source| ConfigError::InvalidAddr { value: raw, source })
}

pub fn logging_config_from_env() -> LoggingConfig {
    let mut config = LoggingConfig::default();

    if let Some(level) = env_text("COMISSOES_LOG_LEVEL") {
        config.level = level;
    }
    if let Some(format) = env_text("COMISSOES_LOG_FORMAT").and_then(|raw| parse_log_format(&raw)) {
        config.format = format;
    }
    if let Some(flag) = env_text("COMISSOES_LOG_TARGET").and_then(|raw| parse_flag(&raw)) {
        config.include_target = flag;
    }

    config
}

/// Parses the API root, forcing a trailing slash so relative endpoint
/// paths join under it instead of replacing its last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        source,
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::BaseUrlNotHierarchical(raw.to_string()));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn env_text(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_text(key).and_then(|raw| raw.parse().ok())
}

fn parse_log_format(raw: &str) -> Option<LogFormat> {
    match raw.to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "sim" => Some(true),
        "0" | "false" | "no" | "off" | "nao" | "não" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::env;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    /// Runs `f` with the given variables set (or removed), then restores them.
    pub(crate) fn with_env_vars<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock should not be poisoned");
        let saved: Vec<(&str, Option<String>)> =
            vars.iter().map(|(key, _)| (*key, env::var(key).ok())).collect();

        apply(vars.iter().map(|(key, value)| (*key, value.map(str::to_string))));
        let output = f();
        apply(saved);
        output
    }

    fn apply<'a>(vars: impl IntoIterator<Item = (&'a str, Option<String>)>) {
        for (key, value) in vars {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}
