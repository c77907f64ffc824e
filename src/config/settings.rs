use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_BASE_URL, DEFAULT_CUSTOMER, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_USER_AGENT,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

/// ================================
/// Global settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    #[serde(default)]
    pub api: ApiSettings,
    pub retry: Option<RetryConfig>,
    pub pagination: Option<PaginationConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Immutable API endpoint settings, handed to the executor at construction.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// customer id used by list calls that are not scoped to a domain
    #[serde(default = "default_customer")]
    pub customer: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// advertise gzip and mark the user agent accordingly
    #[serde(default = "default_compression")]
    pub compression: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            customer: default_customer(),
            user_agent: default_user_agent(),
            compression: default_compression(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetryConfig {
    /// retries after the first call, invariant: 1..=5
    pub max_attempts: Option<u32>,
    /// delay unit, multiplied by 2^attempt on every retry
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaginationConfig {
    /// page size sent as `maxResults`, invariant: 1..=500
    pub max_results: Option<u32>,
    /// hard ceiling on pages, unbounded when absent
    pub max_pages: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProfilesConfig {
    pub path: Option<String>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_customer() -> String {
    DEFAULT_CUSTOMER.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_compression() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}
