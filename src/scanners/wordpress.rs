// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WordPress Enumeration Run
 * Target checks, per-family detection and optional credential testing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{AppConfig, DataPaths, ScannerConfig};
use crate::context::ScanContext;
use crate::errors::{ScannerError, ScannerResult};
use crate::models::ItemCollection;
use crate::scanners::brute_force::{BruteForceOptions, BruteForceReport, CredentialBruteForcer};
use crate::scanners::detector::{DetectionOptions, Detector};
use crate::scanners::families::{
    parse_id_range, DirectoryFamily, ItemFamily, TimthumbFamily, UserFamily, DEFAULT_USER_ID_RANGE,
};
use crate::target::{PageFingerprints, WpTarget};

pub const DEFAULT_ENUMERATION: &str = "vt,tt,u,vp";

/// Which plugins or themes to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentScope {
    Vulnerable,
    Popular,
    All,
}

/// Parsed `--enumerate` value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumerationPlan {
    pub plugins: Option<ComponentScope>,
    pub themes: Option<ComponentScope>,
    pub timthumbs: bool,
    pub users: Option<(u32, u32)>,
}

impl EnumerationPlan {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_none() && self.themes.is_none() && !self.timthumbs && self.users.is_none()
    }
}

impl FromStr for EnumerationPlan {
    type Err = ScannerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut plan = EnumerationPlan::default();

        fn set_scope(
            slot: &mut Option<ComponentScope>,
            scope: ComponentScope,
            what: &str,
        ) -> ScannerResult<()> {
            if slot.is_some_and(|existing| existing != scope) {
                return Err(ScannerError::config(format!(
                    "Please only use one {} option",
                    what
                )));
            }
            *slot = Some(scope);
            Ok(())
        }

        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token {
                "p" => set_scope(&mut plan.plugins, ComponentScope::Popular, "plugin")?,
                "vp" => set_scope(&mut plan.plugins, ComponentScope::Vulnerable, "plugin")?,
                "ap" => set_scope(&mut plan.plugins, ComponentScope::All, "plugin")?,
                "t" => set_scope(&mut plan.themes, ComponentScope::Popular, "theme")?,
                "vt" => set_scope(&mut plan.themes, ComponentScope::Vulnerable, "theme")?,
                "at" => set_scope(&mut plan.themes, ComponentScope::All, "theme")?,
                "tt" => plan.timthumbs = true,
                "u" => plan.users = Some(DEFAULT_USER_ID_RANGE),
                other if other.starts_with("u[") => plan.users = Some(parse_id_range(other)?),
                other => {
                    return Err(ScannerError::config(format!(
                        "Unknown enumeration option: {}",
                        other
                    )))
                }
            }
        }

        Ok(plan)
    }
}

/// Credential testing requested for the run
#[derive(Debug, Clone)]
pub struct BruteForceSettings {
    pub wordlist: PathBuf,
    /// Test only this login instead of every enumerated user
    pub username: Option<String>,
    pub options: BruteForceOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub wp_content_dir: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub requests_failed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<ItemCollection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub themes: Option<ItemCollection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timthumbs: Option<ItemCollection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<ItemCollection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub brute_force: Vec<BruteForceReport>,
}

pub struct WordPressScanner {
    ctx: ScanContext,
    scanner: ScannerConfig,
    paths: DataPaths,
    show_progression: bool,
}

impl WordPressScanner {
    pub fn new(ctx: ScanContext, config: &AppConfig) -> Self {
        Self {
            ctx,
            scanner: config.scanner.clone(),
            paths: config.paths.clone(),
            show_progression: false,
        }
    }

    pub fn with_progression(mut self, show: bool) -> Self {
        self.show_progression = show;
        self
    }

    /// Resolve the target: redirects, WordPress check, content directory
    pub async fn prepare_target(&self, url: &str) -> ScannerResult<WpTarget> {
        let mut target = WpTarget::new(url)?;
        if let Some(dir) = &self.scanner.wp_content_dir {
            target = target.with_wp_content_dir(dir.clone());
        }
        if let Some(dir) = &self.scanner.wp_plugins_dir {
            target = target.with_wp_plugins_dir(dir.clone());
        }

        target
            .check_redirection(&self.ctx, self.scanner.follow_redirection)
            .await?;

        if !self.scanner.force && !target.is_wordpress(&self.ctx).await? {
            return Err(ScannerError::NotWordPress {
                url: target.as_str().to_string(),
            });
        }

        if target.detect_wp_content_dir(&self.ctx).await?.is_none() {
            warn!(
                "[WordPress] The wp-content directory was not found, using {}",
                target.wp_content_dir()
            );
        }

        Ok(target)
    }

    pub async fn run(
        &self,
        url: &str,
        plan: &EnumerationPlan,
        brute_force: Option<&BruteForceSettings>,
    ) -> ScannerResult<ScanReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        let exclude_content = self.exclude_content()?;

        let target = self.prepare_target(url).await?;
        info!("[WordPress] Scanning {}", target.as_str());

        let fingerprints = PageFingerprints::fetch(&target, &self.ctx).await?;

        let mut report = ScanReport {
            target: target.as_str().to_string(),
            wp_content_dir: target.wp_content_dir().to_string(),
            started_at,
            duration_ms: 0,
            requests_failed: 0,
            plugins: None,
            themes: None,
            timthumbs: None,
            users: None,
            brute_force: Vec::new(),
        };

        if let Some(scope) = plan.plugins {
            let family: Arc<dyn ItemFamily> = Arc::new(DirectoryFamily::plugins());
            let options = self.scoped_options(family.as_ref(), scope, &exclude_content);
            report.plugins = Some(self.detect(&target, &fingerprints, family, &options).await?);
        }

        if let Some(scope) = plan.themes {
            let family: Arc<dyn ItemFamily> = Arc::new(DirectoryFamily::themes());
            let options = self.scoped_options(family.as_ref(), scope, &exclude_content);
            report.themes = Some(self.detect(&target, &fingerprints, family, &options).await?);
        }

        if plan.timthumbs {
            let family: Arc<dyn ItemFamily> = Arc::new(TimthumbFamily);
            let options = DetectionOptions {
                file: existing(self.paths.timthumbs_file()),
                exclude_content: exclude_content.clone(),
                show_progression: self.show_progression,
                ..Default::default()
            };
            report.timthumbs = Some(self.detect(&target, &fingerprints, family, &options).await?);
        }

        let wants_users = plan.users.is_some()
            || brute_force.is_some_and(|settings| settings.username.is_none());
        if wants_users {
            let (from, to) = plan.users.unwrap_or(DEFAULT_USER_ID_RANGE);
            report.users = Some(
                self.enumerate_users(&target, &fingerprints, from, to, &exclude_content)
                    .await?,
            );
        }

        if let Some(settings) = brute_force {
            let logins: Vec<String> = match &settings.username {
                Some(username) => vec![username.clone()],
                None => report
                    .users
                    .as_ref()
                    .map(|users| users.iter().map(|u| u.name.clone()).collect())
                    .unwrap_or_default(),
            };

            if logins.is_empty() {
                warn!("[BruteForce] No usernames to test");
            } else {
                let bruteforcer = CredentialBruteForcer::new(self.ctx.clone(), target.clone());
                report.brute_force = bruteforcer
                    .brute_force_users(&logins, &settings.wordlist, &settings.options)
                    .await?;
            }
        }

        report.requests_failed = self.ctx.health.failure_count();
        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    pub async fn enumerate_users(
        &self,
        target: &WpTarget,
        fingerprints: &PageFingerprints,
        from: u32,
        to: u32,
        exclude_content: &Option<Regex>,
    ) -> ScannerResult<ItemCollection> {
        let family = UserFamily::new();
        let options = DetectionOptions {
            candidates: family.id_range(target, from, to),
            exclude_content: exclude_content.clone(),
            show_progression: self.show_progression,
            ..Default::default()
        };
        self.detect(target, fingerprints, Arc::new(family), &options)
            .await
    }

    async fn detect(
        &self,
        target: &WpTarget,
        fingerprints: &PageFingerprints,
        family: Arc<dyn ItemFamily>,
        options: &DetectionOptions,
    ) -> ScannerResult<ItemCollection> {
        let kind = family.kind();
        let detector = Detector::new(self.ctx.clone(), target.clone(), family)
            .with_fingerprints(fingerprints.clone());
        let found = detector.detect(options).await?;
        info!("[WordPress] {} {} found", found.len(), kind.plural());
        Ok(found)
    }

    fn scoped_options(
        &self,
        family: &dyn ItemFamily,
        scope: ComponentScope,
        exclude_content: &Option<Regex>,
    ) -> DetectionOptions {
        let file = family
            .candidate_files(&self.paths)
            .map(|(popular, full)| match scope {
                ComponentScope::All => full,
                _ => popular,
            })
            .and_then(existing);

        DetectionOptions {
            only_vulnerable: scope == ComponentScope::Vulnerable,
            file,
            vulns_file: family.vuln_database_file(&self.paths),
            candidates: Vec::new(),
            exclude_content: exclude_content.clone(),
            show_progression: self.show_progression,
        }
    }

    fn exclude_content(&self) -> ScannerResult<Option<Regex>> {
        self.scanner
            .exclude_content_based
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ScannerError::config(format!("Invalid --exclude-content-based: {}", e))
                })
            })
            .transpose()
    }
}

/// Bundled data files are optional, a missing one counts as not supplied
fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}
