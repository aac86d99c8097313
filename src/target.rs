// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WordPress Target
 * Base URL handling, content directory layout and page fingerprints
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::context::ScanContext;
use crate::errors::{ScannerError, ScannerResult};
use crate::http_client::{HttpResponse, ProbeRequest};
use crate::models::ItemKind;

pub const DEFAULT_WP_CONTENT_DIR: &str = "wp-content";

/// Homepage markers that give WordPress away
const WORDPRESS_INDICATORS: &[&str] = &[
    "wp-content",
    "wp-includes",
    "<meta name=\"generator\" content=\"WordPress",
];

#[derive(Debug, Clone)]
pub struct WpTarget {
    url: Url,
    wp_content_dir: Option<String>,
    wp_plugins_dir: Option<String>,
}

impl WpTarget {
    /// Parse and normalize a target URL. A missing scheme means http, the
    /// path always ends with `/`.
    pub fn new(url: &str) -> ScannerResult<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ScannerError::config("The URL is mandatory, please supply it with --url"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let mut parsed = Url::parse(&with_scheme)
            .map_err(|e| ScannerError::InvalidUrl(format!("{}: {}", trimmed, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScannerError::InvalidUrl(format!(
                "{}: only http and https are supported",
                trimmed
            )));
        }

        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        parsed.set_query(None);
        parsed.set_fragment(None);

        Ok(Self {
            url: parsed,
            wp_content_dir: None,
            wp_plugins_dir: None,
        })
    }

    pub fn with_wp_content_dir(mut self, dir: impl Into<String>) -> Self {
        self.wp_content_dir = Some(trim_slashes(&dir.into()));
        self
    }

    pub fn with_wp_plugins_dir(mut self, dir: impl Into<String>) -> Self {
        self.wp_plugins_dir = Some(trim_slashes(&dir.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn has_wp_content_dir(&self) -> bool {
        self.wp_content_dir.is_some()
    }

    pub fn wp_content_dir(&self) -> &str {
        self.wp_content_dir.as_deref().unwrap_or(DEFAULT_WP_CONTENT_DIR)
    }

    pub fn wp_plugins_dir(&self) -> String {
        match &self.wp_plugins_dir {
            Some(dir) => dir.clone(),
            None => format!("{}/plugins", self.wp_content_dir()),
        }
    }

    pub fn join(&self, path: &str) -> ScannerResult<Url> {
        Ok(self.url.join(path.trim_start_matches('/'))?)
    }

    pub fn login_url(&self) -> ScannerResult<Url> {
        self.join("wp-login.php")
    }

    pub fn plugins_url(&self) -> ScannerResult<Url> {
        self.join(&format!("{}/", self.wp_plugins_dir()))
    }

    pub fn themes_url(&self) -> ScannerResult<Url> {
        self.join(&format!("{}/themes/", self.wp_content_dir()))
    }

    pub fn author_url(&self, id: u32) -> Url {
        let mut url = self.url.clone();
        url.set_query(Some(&format!("author={}", id)));
        url
    }

    /// Location of a named item: directory for plugins and themes, the path
    /// itself for timthumbs. Users are addressed by id, see [`author_url`].
    ///
    /// [`author_url`]: Self::author_url
    pub fn item_uri(&self, kind: ItemKind, name: &str) -> ScannerResult<Url> {
        match kind {
            ItemKind::Plugin => Ok(self.plugins_url()?.join(&format!("{}/", name))?),
            ItemKind::Theme => Ok(self.themes_url()?.join(&format!("{}/", name))?),
            ItemKind::Timthumb => self.join(name),
            ItemKind::User => self.join(&format!("author/{}/", name)),
        }
    }

    /// A page that should not exist, random name plus `.html`
    pub fn error_404_url(&self) -> ScannerResult<Url> {
        let mut rng = rand::rng();
        let name: String = (0..32)
            .map(|_| char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'))
            .collect();
        self.join(&format!("{}.html", name))
    }

    /// Homepage request, cached for the run
    pub fn homepage_request(&self, ctx: &ScanContext) -> ProbeRequest {
        ProbeRequest::get(self.as_str()).with_cache_ttl(ctx.cache_ttl)
    }

    pub async fn fetch_homepage(&self, ctx: &ScanContext) -> ScannerResult<HttpResponse> {
        ctx.fetch(self.homepage_request(ctx)).await
    }

    /// Fail on a 3xx homepage, or move onto its Location when following is on
    pub async fn check_redirection(&mut self, ctx: &ScanContext, follow: bool) -> ScannerResult<()> {
        let homepage = self.fetch_homepage(ctx).await?;
        if !homepage.is_redirect() {
            return Ok(());
        }

        let Some(location) = homepage.header("location") else {
            return Ok(());
        };
        let resolved = self.url.join(location)?;

        if !follow {
            return Err(ScannerError::Redirected {
                location: resolved.to_string(),
            });
        }

        info!("[WordPress] Following redirection to {}", resolved);
        let mut followed = WpTarget::new(resolved.as_str())?;
        followed.wp_content_dir = self.wp_content_dir.take();
        followed.wp_plugins_dir = self.wp_plugins_dir.take();
        *self = followed;
        Ok(())
    }

    /// Homepage markers first, then the login form
    pub async fn is_wordpress(&self, ctx: &ScanContext) -> ScannerResult<bool> {
        let homepage = self.fetch_homepage(ctx).await?;
        if WORDPRESS_INDICATORS.iter().any(|i| homepage.contains(i)) {
            return Ok(true);
        }

        let login = ctx
            .fetch(ProbeRequest::get(self.login_url()?.as_str()).with_cache_ttl(ctx.cache_ttl))
            .await?;
        Ok(login.status_code == 200 && login.contains("user_login"))
    }

    /// Look for the content directory in homepage asset links and keep it
    pub async fn detect_wp_content_dir(&mut self, ctx: &ScanContext) -> ScannerResult<Option<String>> {
        if self.has_wp_content_dir() {
            return Ok(self.wp_content_dir.clone());
        }

        let homepage = self.fetch_homepage(ctx).await?;
        let detected = find_wp_content_dir(&self.url, &homepage.body);
        match &detected {
            Some(dir) => {
                debug!("[WordPress] Content directory detected: {}", dir);
                self.wp_content_dir = Some(dir.clone());
            }
            None => debug!(
                "[WordPress] Content directory not found, assuming {}",
                DEFAULT_WP_CONTENT_DIR
            ),
        }
        Ok(detected)
    }
}

fn trim_slashes(dir: &str) -> String {
    dir.trim_matches('/').to_string()
}

/// `<base>/<dir>/(themes|plugins|uploads)/` in the page, relative links included
fn find_wp_content_dir(base: &Url, body: &str) -> Option<String> {
    let base_str = base.as_str();
    let host_relative = base.path();
    let pattern = format!(
        r#"(?:{}|["']{})([\w\-./]+?)/(?:themes|plugins|uploads)/"#,
        regex::escape(base_str),
        regex::escape(host_relative)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| trim_slashes(m.as_str()))
        .filter(|dir| !dir.is_empty())
}

/// SHA-256 of a page body with HTML comments removed, hex encoded.
/// Comments often carry timestamps or cache ids that change per request.
pub fn page_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(strip_html_comments(body).as_bytes());
    hex::encode(hasher.finalize())
}

fn strip_html_comments(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start + 4..].find("-->") {
            Some(end) => rest = &rest[start + 4 + end + 3..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Hashes of the homepage and of a page that does not exist, computed once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFingerprints {
    pub homepage_hash: String,
    pub error_404_hash: String,
}

impl PageFingerprints {
    pub async fn fetch(target: &WpTarget, ctx: &ScanContext) -> ScannerResult<Self> {
        let homepage = target.fetch_homepage(ctx).await?;
        let not_found = ctx
            .fetch(ProbeRequest::get(target.error_404_url()?.as_str()))
            .await?;

        Ok(Self {
            homepage_hash: page_hash(&homepage.body),
            error_404_hash: page_hash(&not_found.body),
        })
    }

    /// The body is neither the homepage nor the 404 page
    pub fn is_distinct(&self, body: &str) -> bool {
        let hash = page_hash(body);
        hash != self.homepage_hash && hash != self.error_404_hash
    }
}
