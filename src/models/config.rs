//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Wiki source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Proxy fallback chain settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Local snapshot cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Synchronization behavior settings
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.api_base.trim().is_empty() {
            return Err(AppError::config("source.api_base is empty"));
        }
        if self.source.index_page.trim().is_empty() {
            return Err(AppError::config("source.index_page is empty"));
        }
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::config("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::config("source.timeout_secs must be > 0"));
        }
        if self.proxy.endpoints.is_empty() {
            return Err(AppError::config("proxy.endpoints must not be empty"));
        }
        for endpoint in &self.proxy.endpoints {
            if !endpoint.contains("{url}") {
                return Err(AppError::config(format!(
                    "proxy endpoint '{endpoint}' is missing the {{url}} placeholder"
                )));
            }
        }
        if self.cache.ttl_secs == 0 {
            return Err(AppError::config("cache.ttl_secs must be > 0"));
        }
        if self.sync.concurrency == 0 {
            return Err(AppError::config("sync.concurrency must be > 0"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            proxy: ProxyConfig::default(),
            cache: CacheConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// Wiki source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Render API endpoint of the wiki
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Page holding the submission index
    #[serde(default = "defaults::index_page")]
    pub index_page: String,

    /// URL marker that identifies a submission page link
    #[serde(default = "defaults::submission_marker")]
    pub submission_marker: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Base URL for bucketed static image assets
    #[serde(default = "defaults::static_asset_base")]
    pub static_asset_base: String,

    /// Asset delivery endpoint for numeric asset ids
    #[serde(default = "defaults::asset_delivery_base")]
    pub asset_delivery_base: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            index_page: defaults::index_page(),
            submission_marker: defaults::submission_marker(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            static_asset_base: defaults::static_asset_base(),
            asset_delivery_base: defaults::asset_delivery_base(),
        }
    }
}

/// Proxy fallback chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Ordered endpoint templates; `{url}` is replaced with the
    /// percent-encoded target. The identity template `"{url}"` means
    /// direct access with no proxy.
    #[serde(default = "defaults::proxy_endpoints")]
    pub endpoints: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoints: defaults::proxy_endpoints(),
        }
    }
}

/// Local snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum snapshot age in seconds before it is considered stale
    #[serde(default = "defaults::cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::cache_ttl(),
        }
    }
}

/// Synchronization behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Number of concurrent enrichment workers
    #[serde(default = "defaults::concurrency")]
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::concurrency(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn api_base() -> String {
        "https://tds.fandom.com/api.php".into()
    }
    pub fn index_page() -> String {
        "User:Gabonnie/DBT".into()
    }
    pub fn submission_marker() -> String {
        "User_blog:".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; towerdex/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn static_asset_base() -> String {
        "https://static.wikia.nocookie.net/tower-defense-sim/images".into()
    }
    pub fn asset_delivery_base() -> String {
        "https://assetdelivery.roblox.com/v2/assetId".into()
    }

    // Proxy defaults: identity first, then relays
    pub fn proxy_endpoints() -> Vec<String> {
        vec![
            "{url}".into(),
            "https://api.tds-editor.com/?url={url}".into(),
            "https://corsproxy.io/?url={url}".into(),
            "https://api.allorigins.win/raw?url={url}".into(),
        ]
    }

    // Cache defaults
    pub fn cache_ttl() -> u64 {
        12 * 60 * 60
    }

    // Sync defaults
    pub fn concurrency() -> usize {
        5
    }
}
