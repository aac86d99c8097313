// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use regex::Regex;
use validator::Validate;

use super::core::AppConfig;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_app_config(config: &AppConfig) -> Result<()> {
        config.validate()
            .context("Configuration validation failed")?;

        Self::validate_scanner_config(config)?;
        Self::validate_http_config(config)?;

        Ok(())
    }

    fn validate_scanner_config(config: &AppConfig) -> Result<()> {
        if config.scanner.max_threads == 0 {
            return Err(anyhow::anyhow!("Max threads must be greater than 0"));
        }

        if let Some(pattern) = &config.scanner.exclude_content_based {
            Regex::new(pattern)
                .with_context(|| format!("Invalid --exclude-content-based pattern: {}", pattern))?;
        }

        Ok(())
    }

    fn validate_http_config(config: &AppConfig) -> Result<()> {
        for (name, value) in [
            ("proxy-auth", &config.http.proxy_auth),
            ("basic-auth", &config.http.basic_auth),
        ] {
            if let Some(credentials) = value {
                if !credentials.contains(':') {
                    return Err(anyhow::anyhow!(
                        "Invalid {} format, <username:password> expected",
                        name
                    ));
                }
            }
        }

        if config.http.proxy_auth.is_some() && config.http.proxy.is_none() {
            return Err(anyhow::anyhow!("--proxy-auth requires --proxy"));
        }

        Ok(())
    }
}
