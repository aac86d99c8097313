// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WordPress Item Families
 * Passive fingerprint rules, candidate parsing and existence checks for
 * plugins, themes, timthumb scripts and users
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use regex::Regex;
use std::collections::BTreeSet;

use crate::config::DataPaths;
use crate::errors::{ScannerError, ScannerResult};
use crate::http_client::{HttpResponse, ProbeRequest};
use crate::models::{Confirmable, Item, ItemKind};
use crate::target::{PageFingerprints, WpTarget};

/// Status codes that count as "something is there" for content items
pub const VALID_RESPONSE_CODES: &[u16] = &[200, 401, 403];

pub const DEFAULT_USER_ID_RANGE: (u32, u32) = (1, 10);

/// Largest number of author ids one range may cover
pub const MAX_USER_ID_SPAN: u32 = 10_000;

/// What an existence predicate gets to look at besides the response
pub struct ExistenceCheck {
    pub target: WpTarget,
    pub fingerprints: PageFingerprints,
    /// Responses whose body matches are never accepted
    pub exclude_content: Option<Regex>,
}

impl ExistenceCheck {
    pub fn new(target: WpTarget, fingerprints: PageFingerprints) -> Self {
        Self {
            target,
            fingerprints,
            exclude_content: None,
        }
    }

    pub fn with_exclude_content(mut self, pattern: Option<Regex>) -> Self {
        self.exclude_content = pattern;
        self
    }

    fn is_excluded(&self, body: &str) -> bool {
        self.exclude_content
            .as_ref()
            .is_some_and(|re| re.is_match(body))
    }

    /// Default predicate for directory-like content items
    pub fn content_exists(&self, response: &HttpResponse) -> bool {
        VALID_RESPONSE_CODES.contains(&response.status_code)
            && self.fingerprints.is_distinct(&response.body)
            && !self.is_excluded(&response.body)
    }
}

/// One kind of enumerable item and everything kind-specific about finding it
pub trait ItemFamily: Send + Sync {
    fn kind(&self) -> ItemKind;

    /// Items referenced in an already-fetched page
    fn passive_matches(&self, target: &WpTarget, body: &str) -> Vec<Item>;

    /// Items described by one line of a candidate list
    fn candidates_from_token(&self, target: &WpTarget, token: &str) -> ScannerResult<Vec<Item>>;

    /// Probe issued for one candidate during aggressive detection
    fn existence_request(&self, item: &Item) -> ProbeRequest {
        ProbeRequest::get(item.uri.as_str())
    }

    /// The confirmed item when the response proves the candidate exists
    fn confirm(&self, item: Item, response: &HttpResponse, check: &ExistenceCheck) -> Option<Item> {
        check.content_exists(response).then(|| item.confirm())
    }

    /// Follow-up probe that reveals the installed version of a confirmed item
    fn version_request(&self, _item: &Item) -> Option<ProbeRequest> {
        None
    }

    fn version_from(&self, _response: &HttpResponse) -> Option<String> {
        None
    }

    /// Popular and full candidate lists, in that order
    fn candidate_files(&self, _paths: &DataPaths) -> Option<(std::path::PathBuf, std::path::PathBuf)> {
        None
    }

    fn vuln_database_file(&self, _paths: &DataPaths) -> Option<std::path::PathBuf> {
        None
    }
}

/// Plugins and themes: named directories under the content directory
pub struct DirectoryFamily {
    kind: ItemKind,
    /// File inside the item directory that carries its version
    version_file: &'static str,
    version_pattern: Option<Regex>,
}

impl DirectoryFamily {
    /// Versions come from the `Stable tag:` line of readme.txt
    pub fn plugins() -> Self {
        Self {
            kind: ItemKind::Plugin,
            version_file: "readme.txt",
            version_pattern: Regex::new(r"(?i)Stable tag:\s*(\d[\d.]*)").ok(),
        }
    }

    /// Versions come from the `Version:` header of style.css
    pub fn themes() -> Self {
        Self {
            kind: ItemKind::Theme,
            version_file: "style.css",
            version_pattern: Regex::new(r"(?im)^[\s*]*Version:\s*(\d[\d.]*)").ok(),
        }
    }

    fn directory(&self, target: &WpTarget) -> String {
        match self.kind {
            ItemKind::Theme => format!("{}/themes", target.wp_content_dir()),
            _ => target.wp_plugins_dir(),
        }
    }

    fn passive_regex(&self, target: &WpTarget) -> Option<Regex> {
        let host = target.url().host_str().unwrap_or_default();
        let pattern = format!(
            r#"(?i)(?:{}(?::\d+)?|['"(=])(?:/[^/'"\s<>]+)*?/{}/([\w.\-]+)/"#,
            regex::escape(host),
            regex::escape(&self.directory(target))
        );
        Regex::new(&pattern).ok()
    }
}

impl ItemFamily for DirectoryFamily {
    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn passive_matches(&self, target: &WpTarget, body: &str) -> Vec<Item> {
        let Some(re) = self.passive_regex(target) else {
            return Vec::new();
        };

        let names: BTreeSet<String> = re
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
            .collect();

        names
            .into_iter()
            .filter_map(|name| {
                let uri = target.item_uri(self.kind, &name).ok()?;
                Some(Item::new(self.kind, name, uri))
            })
            .collect()
    }

    fn candidates_from_token(&self, target: &WpTarget, token: &str) -> ScannerResult<Vec<Item>> {
        let name = token.trim().trim_matches('/');
        if name.is_empty() {
            return Ok(Vec::new());
        }
        let uri = target.item_uri(self.kind, name)?;
        Ok(vec![Item::new(self.kind, name, uri)])
    }

    fn version_request(&self, item: &Item) -> Option<ProbeRequest> {
        let url = item.uri.join(self.version_file).ok()?;
        Some(ProbeRequest::get(url.as_str()))
    }

    fn version_from(&self, response: &HttpResponse) -> Option<String> {
        if response.status_code != 200 {
            return None;
        }
        self.version_pattern
            .as_ref()?
            .captures(&response.body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches('.').to_string())
            .filter(|version| !version.is_empty())
    }

    fn candidate_files(&self, paths: &DataPaths) -> Option<(std::path::PathBuf, std::path::PathBuf)> {
        match self.kind {
            ItemKind::Theme => Some((paths.themes_file(), paths.themes_full_file())),
            _ => Some((paths.plugins_file(), paths.plugins_full_file())),
        }
    }

    fn vuln_database_file(&self, paths: &DataPaths) -> Option<std::path::PathBuf> {
        match self.kind {
            ItemKind::Theme => Some(paths.theme_vulns_file()),
            _ => Some(paths.plugin_vulns_file()),
        }
    }
}

/// Timthumb image resizer scripts, probed by path
pub struct TimthumbFamily;

impl ItemFamily for TimthumbFamily {
    fn kind(&self) -> ItemKind {
        ItemKind::Timthumb
    }

    fn passive_matches(&self, _target: &WpTarget, _body: &str) -> Vec<Item> {
        Vec::new()
    }

    fn candidates_from_token(&self, target: &WpTarget, token: &str) -> ScannerResult<Vec<Item>> {
        let path = token.trim().trim_start_matches('/');
        if path.is_empty() {
            return Ok(Vec::new());
        }
        let uri = target.item_uri(ItemKind::Timthumb, path)?;
        Ok(vec![Item::new(ItemKind::Timthumb, path, uri)])
    }

    /// Timthumb answers a bare request with 400 "no image specified"
    fn confirm(&self, item: Item, response: &HttpResponse, check: &ExistenceCheck) -> Option<Item> {
        let exists = response.status_code == 400
            && response.body.to_lowercase().contains("no image specified")
            && !check.is_excluded(&response.body);
        exists.then(|| item.confirm())
    }

    fn candidate_files(&self, paths: &DataPaths) -> Option<(std::path::PathBuf, std::path::PathBuf)> {
        Some((paths.timthumbs_file(), paths.timthumbs_file()))
    }
}

/// Authors, probed by numeric id through `?author=N`
pub struct UserFamily {
    author_link: Option<Regex>,
    author_class: Option<Regex>,
}

impl UserFamily {
    pub fn new() -> Self {
        Self {
            author_link: Regex::new(r#"/author/([^/'"\s?#<>]+)/"#).ok(),
            author_class: Regex::new(r#"\bauthor-([\w.@\-]+)"#).ok(),
        }
    }

    /// Candidates for an inclusive id range
    pub fn id_range(&self, target: &WpTarget, from: u32, to: u32) -> Vec<Item> {
        (from..=to)
            .map(|id| Item::new(ItemKind::User, id.to_string(), target.author_url(id)).with_id(id))
            .collect()
    }

    fn login_from_location(&self, location: &str) -> Option<String> {
        self.author_link
            .as_ref()?
            .captures(location)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn login_from_body(&self, body: &str) -> Option<String> {
        if let Some(login) = self.login_from_location(body) {
            return Some(login);
        }
        self.author_class
            .as_ref()?
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|login| !login.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }
}

impl Default for UserFamily {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemFamily for UserFamily {
    fn kind(&self) -> ItemKind {
        ItemKind::User
    }

    fn passive_matches(&self, target: &WpTarget, body: &str) -> Vec<Item> {
        let Some(re) = &self.author_link else {
            return Vec::new();
        };

        let logins: BTreeSet<String> = re
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect();

        logins
            .into_iter()
            .filter_map(|login| {
                let uri = target.item_uri(ItemKind::User, &login).ok()?;
                Some(Item::new(ItemKind::User, login, uri))
            })
            .collect()
    }

    /// `N`, `a-b` or `u[a-b]`
    fn candidates_from_token(&self, target: &WpTarget, token: &str) -> ScannerResult<Vec<Item>> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(Vec::new());
        }
        let (from, to) = parse_id_range(token)?;
        Ok(self.id_range(target, from, to))
    }

    fn confirm(&self, item: Item, response: &HttpResponse, check: &ExistenceCheck) -> Option<Item> {
        let login = if response.is_redirect() {
            response
                .header("location")
                .and_then(|location| self.login_from_location(location))
        } else if response.status_code == 200 && !check.is_excluded(&response.body) {
            self.login_from_body(&response.body)
        } else {
            None
        };
        let login = login?;

        let uri = check.target.item_uri(ItemKind::User, &login).ok()?;
        let mut confirmed = Item::new(ItemKind::User, login, uri).confirm();
        confirmed.id = item.id;
        Some(confirmed)
    }
}

/// Parse a user id range token: `7`, `10-20` or `u[10-20]`
pub fn parse_id_range(token: &str) -> ScannerResult<(u32, u32)> {
    let inner = token
        .trim()
        .strip_prefix("u[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(token.trim());

    let invalid = || ScannerError::config(format!("Invalid user id range: {}", token));

    let (from, to) = match inner.split_once('-') {
        Some((from, to)) => (
            from.trim().parse::<u32>().map_err(|_| invalid())?,
            to.trim().parse::<u32>().map_err(|_| invalid())?,
        ),
        None => {
            let id = inner.parse::<u32>().map_err(|_| invalid())?;
            (id, id)
        }
    };

    if from > to {
        return Err(invalid());
    }
    if to - from >= MAX_USER_ID_SPAN {
        return Err(ScannerError::config(format!(
            "User id range {} is too large (at most {} ids)",
            token, MAX_USER_ID_SPAN
        )));
    }
    Ok((from, to))
}
