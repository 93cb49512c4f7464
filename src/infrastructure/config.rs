//! Configuration infrastructure
//!
//! Contains configuration loading and management for the SlamJam monitor.
//!
//! Configuration is a single JSON file organized into sections:
//! 1. `monitor` - id range, scheduling, retry and concurrency settings
//! 2. `http` - outbound request settings
//! 3. `storage` - cache database and proxy list locations
//! 4. `notify` - notification channel settings
//! 5. `logging` - log level and outputs
//!
//! Any value can be overridden from the environment with the
//! `SLAMJAM_MONITOR__` prefix, e.g. `SLAMJAM_MONITOR__MONITOR__START=1000`.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

/// Range monitor and scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// First numeric id of the monitored range (inclusive)
    pub start: u32,

    /// Last numeric id of the monitored range (inclusive)
    pub end: u32,

    /// Minimum gap between the end of one sweep and the start of the next
    pub interval_seconds: u64,

    /// Total deadline of a single fetch
    pub timeout_seconds: u64,

    /// Attempts per product lookup
    pub retry: u32,

    /// HTTP statuses meaning the product does not exist (no further retries)
    pub retry_stop: Vec<u16>,

    /// Maximum checks in flight during a sweep
    pub max_concurrent: usize,

    /// Freshness window: products created at most this many days ago are announced
    pub delta_days: i64,

    /// Log every failed fetch, not only retries
    pub verbose: bool,

    /// Upper bound of the random delay between attempts (0 disables)
    pub retry_backoff_ms: u64,

    /// Global outbound request rate (0 disables)
    pub max_requests_per_second: u32,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub base_url: String,
    pub user_agent: String,
    pub referer: String,
    pub accept_invalid_certs: bool,
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// sqlx connection string for the product cache and checkpoint
    pub database_url: String,

    /// Plain-text proxy list, one `host:port:user:pass` per line
    pub proxies_path: PathBuf,
}

/// Notification channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Discord webhook receiving new-product embeds; log-only when absent
    pub discord_webhook_url: Option<String>,
    pub embed_color: u32,
    pub footer: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            start: defaults::RANGE_START,
            end: defaults::RANGE_END,
            interval_seconds: defaults::INTERVAL_SECONDS,
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            retry: defaults::RETRY_ATTEMPTS,
            retry_stop: defaults::RETRY_STOP_STATUSES.to_vec(),
            max_concurrent: defaults::MAX_CONCURRENT,
            delta_days: defaults::DELTA_DAYS,
            verbose: false,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: slamjam::API_BASE.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            referer: defaults::REFERER.to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            proxies_path: PathBuf::from(defaults::PROXIES_PATH),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: None,
            embed_color: defaults::EMBED_COLOR,
            footer: defaults::FOOTER.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_filters = HashMap::new();
        module_filters.insert("sqlx".to_string(), "warn".to_string());
        module_filters.insert("reqwest".to_string(), "info".to_string());
        module_filters.insert("hyper".to_string(), "warn".to_string());

        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            module_filters,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl AppConfig {
    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        let monitor = &self.monitor;
        if monitor.start > monitor.end {
            bail!("monitor.start ({}) must not exceed monitor.end ({})", monitor.start, monitor.end);
        }
        if monitor.retry == 0 {
            bail!("monitor.retry must be at least 1");
        }
        if monitor.max_concurrent == 0 {
            bail!("monitor.max_concurrent must be at least 1");
        }
        if monitor.interval_seconds == 0 {
            bail!("monitor.interval_seconds must be greater than 0");
        }
        if monitor.timeout_seconds == 0 {
            bail!("monitor.timeout_seconds must be greater than 0");
        }
        if monitor.delta_days < 0 {
            bail!("monitor.delta_days must not be negative");
        }
        url::Url::parse(&self.http.base_url)
            .with_context(|| format!("http.base_url is not a valid URL: {}", self.http.base_url))?;
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("slamjam-monitor");

        Ok(config_dir)
    }

    /// Configuration manager for the default per-user location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("config.json");
        Ok(Self { config_path })
    }

    /// Configuration manager for an explicit file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { config_path: path.into() }
    }

    /// Use `SLAMJAM_MONITOR_CONFIG` when set, the per-user location otherwise
    pub fn from_env() -> Result<Self> {
        match std::env::var_os("SLAMJAM_MONITOR_CONFIG") {
            Some(path) => Ok(Self::with_path(PathBuf::from(path))),
            None => Self::new(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            self.save_config(&AppConfig::default()).await?;
        }

        let config = Self::read_layered(&self.config_path)?;
        config.validate()?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// File values first, environment overrides on top
    fn read_layered(path: &Path) -> Result<AppConfig> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json))
            .add_source(
                config::Environment::with_prefix("SLAMJAM_MONITOR")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("monitor.retry_stop")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;

        settings
            .try_deserialize::<AppConfig>()
            .context("Configuration file contains invalid values")
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// SlamJam storefront endpoints
pub mod slamjam {
    /// Demandware controller base for the Italian storefront
    pub const API_BASE: &str = "https://www.slamjam.com/on/demandware.store/Sites-slamjam-Site/en_IT";

    /// JSON product endpoint, includes size variations
    pub const WISHLIST_GET_PRODUCT: &str = "Wishlist-GetProduct";

    /// HTML quick-view fragment endpoint
    pub const PRODUCT_SHOW_QUICK_VIEW: &str = "Product-ShowQuickView";

    /// Query parameter carrying the PID
    pub const PID_PARAM: &str = "pid";

    /// Path fragment of the placeholder image served for products without pictures
    pub const NO_IMAGE_MARKER: &str = "product-no-image";
}

/// Default configuration values
pub mod defaults {
    pub const RANGE_START: u32 = 200_000;
    pub const RANGE_END: u32 = 201_000;

    /// Ten minutes between sweeps
    pub const INTERVAL_SECONDS: u64 = 600;

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;
    pub const RETRY_ATTEMPTS: u32 = 3;
    pub const RETRY_STOP_STATUSES: &[u16] = &[404, 410];
    pub const MAX_CONCURRENT: usize = 50;
    pub const DELTA_DAYS: i64 = 7;
    pub const RETRY_BACKOFF_MS: u64 = 250;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 0;

    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
    pub const REFERER: &str = "https://www.slamjam.com/";

    pub const DATABASE_URL: &str = "sqlite://cache.sqlite";
    pub const PROXIES_PATH: &str = "proxies.txt";

    pub const EMBED_COLOR: u32 = 0x00_2F_31_36;
    pub const FOOTER: &str = "SlamJam Scraper | Powered by Ganz";

    pub const LOG_LEVEL: &str = "info";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config = AppConfig::default();
        config.monitor.start = 10;
        config.monitor.end = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_retry_and_concurrency() {
        let mut config = AppConfig::default();
        config.monitor.retry = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.monitor.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn creates_default_file_on_first_load() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::with_path(dir.path().join("nested").join("config.json"));

        let config = manager.load_config().await?;

        assert!(manager.config_path().exists());
        assert_eq!(config.monitor.retry, defaults::RETRY_ATTEMPTS);
        Ok(())
    }

    #[tokio::test]
    async fn partial_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "monitor": { "start": 1000, "end": 1002, "delta_days": 3 } }"#)?;

        let config = ConfigManager::with_path(&path).load_config().await?;

        assert_eq!(config.monitor.start, 1000);
        assert_eq!(config.monitor.end, 1002);
        assert_eq!(config.monitor.delta_days, 3);
        assert_eq!(config.monitor.max_concurrent, defaults::MAX_CONCURRENT);
        assert_eq!(config.http.base_url, slamjam::API_BASE);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_file_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "monitor": { "start": 5, "end": 1 } }"#)?;

        assert!(ConfigManager::with_path(&path).load_config().await.is_err());
        Ok(())
    }
}
