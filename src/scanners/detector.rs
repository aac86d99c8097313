// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WordPress Item Detector
 * Passive fingerprinting of the homepage and aggressive existence probing of
 * candidate plugins, themes, timthumbs and users
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::ScanContext;
use crate::errors::{ScannerError, ScannerResult};
use crate::models::{Item, ItemCollection, VulnDatabase, VulnerabilityMatchable};
use crate::progress::ProgressEvent;
use crate::scanners::families::{ExistenceCheck, ItemFamily};
use crate::target::{PageFingerprints, WpTarget};

#[derive(Debug, Clone, Default)]
pub struct DetectionOptions {
    /// Probe only database entries and keep only vulnerable confirmed items
    pub only_vulnerable: bool,
    /// Candidate list, one token per line
    pub file: Option<PathBuf>,
    pub vulns_file: Option<PathBuf>,
    /// Candidates built by the caller (user id ranges)
    pub candidates: Vec<Item>,
    pub exclude_content: Option<Regex>,
    pub show_progression: bool,
}

/// Detection engine for one item family on one target
pub struct Detector {
    ctx: ScanContext,
    target: WpTarget,
    family: Arc<dyn ItemFamily>,
    fingerprints: Option<PageFingerprints>,
}

impl Detector {
    pub fn new(ctx: ScanContext, target: WpTarget, family: Arc<dyn ItemFamily>) -> Self {
        Self {
            ctx,
            target,
            family,
            fingerprints: None,
        }
    }

    /// Reuse fingerprints computed earlier in the run
    pub fn with_fingerprints(mut self, fingerprints: PageFingerprints) -> Self {
        self.fingerprints = Some(fingerprints);
        self
    }

    /// Combined detection: aggressive results plus whatever the homepage
    /// references. With `only_vulnerable` the homepage is not scanned.
    pub async fn detect(&self, options: &DetectionOptions) -> ScannerResult<ItemCollection> {
        let database = load_database(options)?;

        let aggressive = self.aggressive_detection_with(options, database.as_ref()).await?;
        if options.only_vulnerable {
            return Ok(aggressive);
        }

        let passive = self.passive_detection_with(database.as_ref()).await?;
        Ok(aggressive.union(&passive))
    }

    /// One homepage request, no confirmation probes
    pub async fn passive_detection(&self, options: &DetectionOptions) -> ScannerResult<ItemCollection> {
        let database = load_database(options)?;
        self.passive_detection_with(database.as_ref()).await
    }

    async fn passive_detection_with(&self, database: Option<&VulnDatabase>) -> ScannerResult<ItemCollection> {
        let homepage = self.target.fetch_homepage(&self.ctx).await?;
        Ok(self.passive_detection_in(&homepage.body, database))
    }

    /// Passive rules over an already-fetched page
    pub fn passive_detection_in(&self, body: &str, database: Option<&VulnDatabase>) -> ItemCollection {
        let items: ItemCollection = self
            .family
            .passive_matches(&self.target, body)
            .into_iter()
            .map(|item| item.with_vulnerabilities_from(database))
            .collect();

        debug!(
            "[WordPress] Passive detection found {} {}",
            items.len(),
            self.family.kind().plural()
        );
        items
    }

    pub async fn aggressive_detection(&self, options: &DetectionOptions) -> ScannerResult<ItemCollection> {
        let database = load_database(options)?;
        self.aggressive_detection_with(options, database.as_ref()).await
    }

    async fn aggressive_detection_with(
        &self,
        options: &DetectionOptions,
        database: Option<&VulnDatabase>,
    ) -> ScannerResult<ItemCollection> {
        let candidates = self.targets_items(options, database).await?;
        if candidates.is_empty() {
            return Ok(ItemCollection::new());
        }

        let fingerprints = match &self.fingerprints {
            Some(fingerprints) => fingerprints.clone(),
            None => PageFingerprints::fetch(&self.target, &self.ctx).await?,
        };
        let check = Arc::new(
            ExistenceCheck::new(self.target.clone(), fingerprints)
                .with_exclude_content(options.exclude_content.clone()),
        );

        let kind = self.family.kind();
        let total = candidates.len();
        info!("[WordPress] Probing {} candidate {}", total, kind.plural());
        if options.show_progression {
            self.ctx.progress.emit(ProgressEvent::Started {
                label: format!("Checking {}", kind.plural()),
                total: total as u64,
            });
        }

        let found = Arc::new(Mutex::new(ItemCollection::new()));
        let mut scheduler = self.ctx.scheduler();

        for candidate in candidates {
            let request = self.family.existence_request(&candidate);
            let family = Arc::clone(&self.family);
            let check = Arc::clone(&check);
            let found = Arc::clone(&found);
            let progress = Arc::clone(&self.ctx.progress);
            let show_progression = options.show_progression;

            scheduler.submit(request, move |response| {
                if let Some(item) = family.confirm(candidate, response, &check) {
                    found.lock().push(item);
                }
                if show_progression {
                    progress.emit(ProgressEvent::Advanced);
                }
            });

            if scheduler.is_full() {
                scheduler.run_wave().await?;
            }
        }
        scheduler.drain().await?;

        if options.show_progression {
            self.ctx.progress.emit(ProgressEvent::Finished);
        }

        let confirmed = Arc::try_unwrap(found)
            .map(Mutex::into_inner)
            .unwrap_or_else(|shared| shared.lock().clone());

        debug!(
            "[WordPress] Aggressive detection confirmed {} {} ({} requests)",
            confirmed.len(),
            kind.plural(),
            scheduler.requests_sent()
        );

        let mut found = self.detect_versions(confirmed).await?;
        if options.only_vulnerable {
            found.retain(|item| item.is_vulnerable());
        }
        Ok(found)
    }

    /// Version probes for confirmed items, in waves like the existence probes.
    /// Items whose version cannot be read keep `version = None`.
    pub async fn detect_versions(&self, items: ItemCollection) -> ScannerResult<ItemCollection> {
        let versions = Arc::new(Mutex::new(HashMap::new()));
        let mut scheduler = self.ctx.scheduler();

        for item in items.iter() {
            let Some(request) = self.family.version_request(item) else {
                continue;
            };
            let family = Arc::clone(&self.family);
            let versions = Arc::clone(&versions);
            let name = item.name.clone();

            scheduler.submit(request, move |response| {
                if let Some(version) = family.version_from(response) {
                    versions.lock().insert(name, version);
                }
            });

            if scheduler.is_full() {
                scheduler.run_wave().await?;
            }
        }
        scheduler.drain().await?;

        let versions = std::mem::take(&mut *versions.lock());
        if !versions.is_empty() {
            debug!(
                "[WordPress] Read versions for {} {}",
                versions.len(),
                self.family.kind().plural()
            );
        }

        Ok(items
            .into_iter()
            .map(|item| match versions.get(&item.name) {
                Some(version) => item.with_version(version.clone()),
                None => item,
            })
            .collect())
    }

    /// Candidate set for aggressive detection.
    ///
    /// Vulnerable-only uses the database alone. Otherwise database, list file
    /// and caller-supplied candidates are merged by name.
    pub async fn targets_items(
        &self,
        options: &DetectionOptions,
        database: Option<&VulnDatabase>,
    ) -> ScannerResult<ItemCollection> {
        if options.only_vulnerable {
            return match database {
                Some(db) => Ok(self.vulnerable_targets_items(db).into_iter().collect()),
                None => {
                    warn!(
                        "[WordPress] No vulnerability database for {}, nothing to check",
                        self.family.kind().plural()
                    );
                    Ok(ItemCollection::new())
                }
            };
        }

        if options.file.is_none() && database.is_none() && options.candidates.is_empty() {
            return Err(ScannerError::config("A file must be supplied"));
        }

        let mut items = ItemCollection::new();
        if let Some(db) = database {
            items.extend(self.vulnerable_targets_items(db));
        }
        if let Some(file) = &options.file {
            items.extend(self.targets_items_from_file(file, database).await?);
        }
        items.extend(
            options
                .candidates
                .iter()
                .cloned()
                .map(|item| item.with_vulnerabilities_from(database)),
        );
        Ok(items)
    }

    /// One item per database entry, vulnerabilities attached
    pub fn vulnerable_targets_items(&self, database: &VulnDatabase) -> Vec<Item> {
        database
            .names()
            .filter_map(|name| {
                match self.family.candidates_from_token(&self.target, name) {
                    Ok(items) => Some(items),
                    Err(e) => {
                        debug!("[WordPress] Skipping database entry {}: {}", name, e);
                        None
                    }
                }
            })
            .flatten()
            .map(|item| item.with_vulnerabilities_from(Some(database)))
            .collect()
    }

    /// Items from a candidate list. An empty list is a configuration error.
    pub async fn targets_items_from_file(
        &self,
        path: &Path,
        database: Option<&VulnDatabase>,
    ) -> ScannerResult<Vec<Item>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScannerError::io(path, e))?;

        let mut items = Vec::new();
        for line in content.lines() {
            let token = line.trim();
            if token.is_empty() || token.starts_with('#') {
                continue;
            }
            for item in self.family.candidates_from_token(&self.target, token)? {
                items.push(item.with_vulnerabilities_from(database));
            }
        }

        if items.is_empty() {
            return Err(ScannerError::config(format!(
                "The candidate file {} is empty",
                path.display()
            )));
        }
        Ok(items)
    }
}

fn load_database(options: &DetectionOptions) -> ScannerResult<Option<VulnDatabase>> {
    match &options.vulns_file {
        Some(path) => VulnDatabase::load_optional(path),
        None => Ok(None),
    }
}
