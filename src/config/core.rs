// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    #[validate(nested)]
    pub http: HttpConfig,

    #[serde(default)]
    pub paths: DataPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScannerConfig {
    /// Ceiling on requests in flight at once
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_max_threads", alias = "threads")]
    pub max_threads: usize,

    /// Zero-status responses tolerated before the run aborts
    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_down_threshold")]
    pub target_down_threshold: u32,

    /// Skip the "is this WordPress" check
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub follow_redirection: bool,

    #[serde(default)]
    pub wp_content_dir: Option<String>,

    #[serde(default)]
    pub wp_plugins_dir: Option<String>,

    /// Aggressive matches whose body matches this pattern are discarded
    #[serde(default)]
    pub exclude_content_based: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HttpConfig {
    #[validate(range(min = 1, max = 600000))]
    #[serde(default = "default_request_timeout_ms", alias = "request_timeout")]
    pub request_timeout_ms: u64,

    #[validate(range(min = 1, max = 600000))]
    #[serde(default = "default_connect_timeout_ms", alias = "connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Response cache lifetime for probes; login attempts never use it
    #[serde(default = "default_cache_ttl", alias = "cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub random_user_agent: bool,

    #[serde(default)]
    pub cookie: Option<String>,

    /// `[protocol://]host:port`, HTTP when no protocol is given
    #[serde(default)]
    pub proxy: Option<String>,

    /// `username:password`
    #[serde(default)]
    pub proxy_auth: Option<String>,

    /// `username:password`
    #[serde(default)]
    pub basic_auth: Option<String>,

    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_pool_idle")]
    pub pool_max_idle_per_host: usize,
}

/// Where the candidate lists and vulnerability databases live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl DataPaths {
    pub fn plugins_file(&self) -> PathBuf {
        self.data_dir.join("plugins.txt")
    }

    pub fn plugins_full_file(&self) -> PathBuf {
        self.data_dir.join("plugins_full.txt")
    }

    pub fn plugin_vulns_file(&self) -> PathBuf {
        self.data_dir.join("plugin_vulns.json")
    }

    pub fn themes_file(&self) -> PathBuf {
        self.data_dir.join("themes.txt")
    }

    pub fn themes_full_file(&self) -> PathBuf {
        self.data_dir.join("themes_full.txt")
    }

    pub fn theme_vulns_file(&self) -> PathBuf {
        self.data_dir.join("theme_vulns.json")
    }

    pub fn timthumbs_file(&self) -> PathBuf {
        self.data_dir.join("timthumbs.txt")
    }
}

impl HttpConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            target_down_threshold: default_down_threshold(),
            force: false,
            follow_redirection: false,
            wp_content_dir: None,
            wp_plugins_dir: None,
            exclude_content_based: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            cache_ttl_secs: default_cache_ttl(),
            user_agent: None,
            random_user_agent: false,
            cookie: None,
            proxy: None,
            proxy_auth: None,
            basic_auth: None,
            accept_invalid_certs: false,
            pool_max_idle_per_host: default_pool_idle(),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_max_threads() -> usize {
    20
}

fn default_down_threshold() -> u32 {
    crate::circuit_breaker::DEFAULT_FAILURE_THRESHOLD
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_pool_idle() -> usize {
    32
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.scanner.max_threads, 20);
        assert_eq!(config.scanner.target_down_threshold, 10);
        assert_eq!(config.http.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.paths.plugin_vulns_file(), PathBuf::from("data/plugin_vulns.json"));
    }

    #[test]
    fn test_legacy_keys_accepted() {
        let json = r#"{"scanner": {"threads": 5}, "http": {"request_timeout": 3000, "cache_ttl": 0}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.scanner.max_threads, 5);
        assert_eq!(config.http.request_timeout_ms, 3000);
        assert_eq!(config.http.cache_ttl_secs, 0);
    }
}
