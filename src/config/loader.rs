// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::core::AppConfig;
use super::validation::ConfigValidator;

pub struct ConfigLoader {
    config_path: PathBuf,
    format: ConfigFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref().to_path_buf();
        let format = Self::detect_format(&path)?;

        Ok(Self {
            config_path: path,
            format,
        })
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file format"))?;

        match extension {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(anyhow::anyhow!("Unsupported config file format: {}", extension)),
        }
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        let content = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;

        let mut config = Self::parse(&content, self.format)?;

        apply_env_overrides(&mut config)?;

        ConfigValidator::validate_app_config(&config)?;

        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<AppConfig> {
        let config: AppConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .context("Failed to parse YAML config")?,
            ConfigFormat::Toml => toml::from_str(content)
                .context("Failed to parse TOML config")?,
            ConfigFormat::Json => serde_json::from_str(content)
                .context("Failed to parse JSON config")?,
        };
        Ok(config)
    }
}

/// Load the config file when one is given, defaults otherwise; environment
/// overrides apply in both cases.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    match config_path {
        Some(path) => ConfigLoader::new(path)?.load_config(),
        None => {
            let mut config = AppConfig::default();
            apply_env_overrides(&mut config)?;
            ConfigValidator::validate_app_config(&config)?;
            Ok(config)
        }
    }
}

fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Ok(threads) = std::env::var("WPSCAN_MAX_THREADS") {
        config.scanner.max_threads = threads
            .parse()
            .context("Invalid WPSCAN_MAX_THREADS")?;
    }

    if let Ok(proxy) = std::env::var("WPSCAN_PROXY") {
        config.http.proxy = Some(proxy);
    }

    if let Ok(user_agent) = std::env::var("WPSCAN_USER_AGENT") {
        config.http.user_agent = Some(user_agent);
    }

    if let Ok(data_dir) = std::env::var("WPSCAN_DATA_DIR") {
        config.paths.data_dir = PathBuf::from(data_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_format() {
        assert_eq!(ConfigLoader::new("a.yml").unwrap().format(), ConfigFormat::Yaml);
        assert_eq!(ConfigLoader::new("a.toml").unwrap().format(), ConfigFormat::Toml);
        assert_eq!(ConfigLoader::new("a.json").unwrap().format(), ConfigFormat::Json);
        assert!(ConfigLoader::new("a.ini").is_err());
        assert!(ConfigLoader::new("noext").is_err());
    }

    #[test]
    fn test_parse_yaml_and_toml() {
        let yaml = "scanner:\n  max_threads: 7\nhttp:\n  proxy: 127.0.0.1:8118\n";
        let config = ConfigLoader::parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.scanner.max_threads, 7);
        assert_eq!(config.http.proxy.as_deref(), Some("127.0.0.1:8118"));

        let toml = "[scanner]\nmax_threads = 3\n[paths]\ndata_dir = \"/opt/wp\"\n";
        let config = ConfigLoader::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.scanner.max_threads, 3);
        assert_eq!(config.paths.data_dir, PathBuf::from("/opt/wp"));
    }

    #[test]
    fn test_load_rejects_zero_threads() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"scanner": {{"max_threads": 0}}}}"#).unwrap();

        let result = ConfigLoader::new(file.path()).unwrap().load_config();
        assert!(result.is_err());
    }
}
