// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use moka::future::Cache;
use moka::Expiry;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::errors::{ScannerError, ScannerResult};

/// Realistic browser User-Agents used by --random-agent
const BROWSER_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

pub const DEFAULT_USER_AGENT: &str = "lonkero-wp/0.1 (authorized security assessment)";

/// Maximum response body size (10MB) to prevent memory exhaustion
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

pub fn random_user_agent() -> &'static str {
    let index = rand::rng().random_range(0..BROWSER_USER_AGENTS.len());
    BROWSER_USER_AGENTS[index]
}

/// Request body carried by a probe
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Form(Vec<(String, String)>),
    Raw(String),
}

/// One request as handed to the scheduler
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
    /// Cache lifetime for the response; zero bypasses the cache entirely
    pub cache_ttl: Duration,
    /// Total timeout override, the client default applies otherwise
    pub timeout: Option<Duration>,
}

impl ProbeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
            headers: Vec::new(),
            cache_ttl: Duration::ZERO,
            timeout: None,
        }
    }

    pub fn post_form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(RequestBody::Form(fields)),
            headers: Vec::new(),
            cache_ttl: Duration::ZERO,
            timeout: None,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn is_cacheable(&self) -> bool {
        !self.cache_ttl.is_zero() && self.method == Method::GET && self.body.is_none()
    }

    fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Zero when nothing came back from the network stack
    pub status_code: u16,
    pub body: String,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl HttpResponse {
    /// Placeholder for a request that never produced a response
    pub fn no_response(timed_out: bool, duration_ms: u64) -> Self {
        Self {
            status_code: 0,
            body: String::new(),
            headers: HashMap::new(),
            timed_out,
            duration_ms,
        }
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.body.contains(pattern)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }
}

#[derive(Clone)]
struct CachedResponse {
    response: HttpResponse,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CachedResponse> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedResponse,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thin reqwest wrapper: redirects are never followed, network failures come
/// back as status-0 responses instead of errors.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    timeout: Duration,
    max_body_size: usize,
    cache: Option<Cache<String, CachedResponse>>,
}

impl HttpClient {
    pub fn new(timeout_ms: u64) -> ScannerResult<Self> {
        Self::from_config(&HttpConfig {
            request_timeout_ms: timeout_ms,
            ..HttpConfig::default()
        })
    }

    pub fn from_config(config: &HttpConfig) -> ScannerResult<Self> {
        let user_agent = if config.random_user_agent {
            random_user_agent().to_string()
        } else {
            config
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
        };

        let mut default_headers = HeaderMap::new();
        if let Some(cookie) = &config.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ScannerError::config(format!("Invalid cookie: {}", e)))?;
            default_headers.insert(COOKIE, value);
        }
        if let Some(credentials) = &config.basic_auth {
            let value = HeaderValue::from_str(&basic_auth_header(credentials)?)
                .map_err(|e| ScannerError::config(format!("Invalid basic auth: {}", e)))?;
            default_headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent)
            .default_headers(default_headers)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_nodelay(true);

        if let Some(proxy_url) = &config.proxy {
            let mut proxy = reqwest::Proxy::all(normalize_proxy(proxy_url))
                .map_err(|e| ScannerError::config(format!("Invalid proxy {}: {}", proxy_url, e)))?;
            if let Some(auth) = &config.proxy_auth {
                let (user, pass) = split_credentials(auth)?;
                proxy = proxy.basic_auth(user, pass);
            }
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        let cache = (config.cache_ttl_secs > 0).then(|| {
            Cache::builder()
                .max_capacity(DEFAULT_CACHE_CAPACITY)
                .expire_after(PerEntryTtl)
                .build()
        });

        Ok(Self {
            client: Arc::new(client),
            timeout: Duration::from_millis(config.request_timeout_ms),
            max_body_size: MAX_BODY_SIZE,
            cache,
        })
    }

    /// Issue one request. Never fails: when nothing comes back the response
    /// has status 0 and `timed_out` tells whether the deadline fired.
    pub async fn execute(&self, request: &ProbeRequest) -> HttpResponse {
        let cacheable = self.cache.is_some() && request.is_cacheable();
        if cacheable {
            if let Some(cache) = &self.cache {
                if let Some(hit) = cache.get(&request.cache_key()).await {
                    return hit.response;
                }
            }
        }

        let started = Instant::now();
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout.unwrap_or(self.timeout));

        for (name, value) in &request.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => builder = builder.header(name, value),
                _ => warn!("Dropping invalid header {}", name),
            }
        }

        builder = match &request.body {
            Some(RequestBody::Form(fields)) => builder.form(fields),
            Some(RequestBody::Raw(raw)) => builder.body(raw.clone()),
            None => builder,
        };

        let response = match builder.send().await {
            Ok(response) => {
                let status_code = response.status().as_u16();

                let headers = {
                    let headers = response.headers();
                    let mut map = HashMap::with_capacity(headers.len());
                    for (k, v) in headers.iter() {
                        if let Ok(value_str) = v.to_str() {
                            map.insert(k.as_str().to_string(), value_str.to_string());
                        }
                    }
                    map
                };

                match response.bytes().await {
                    Ok(body_bytes) => {
                        let body = if body_bytes.len() > self.max_body_size {
                            String::from_utf8_lossy(&body_bytes[..self.max_body_size]).to_string()
                        } else {
                            String::from_utf8_lossy(&body_bytes).to_string()
                        };

                        HttpResponse {
                            status_code,
                            body,
                            headers,
                            timed_out: false,
                            duration_ms: started.elapsed().as_millis() as u64,
                        }
                    }
                    Err(e) => {
                        debug!("Body read failed for {}: {}", request.url, e);
                        HttpResponse::no_response(e.is_timeout(), started.elapsed().as_millis() as u64)
                    }
                }
            }
            Err(e) => {
                debug!("Request to {} failed: {}", request.url, e);
                HttpResponse::no_response(e.is_timeout(), started.elapsed().as_millis() as u64)
            }
        };

        if cacheable && response.status_code != 0 {
            if let Some(cache) = &self.cache {
                cache
                    .insert(
                        request.cache_key(),
                        CachedResponse {
                            response: response.clone(),
                            ttl: request.cache_ttl,
                        },
                    )
                    .await;
            }
        }

        response
    }

    pub async fn get(&self, url: &str) -> HttpResponse {
        self.execute(&ProbeRequest::get(url)).await
    }
}

fn split_credentials(credentials: &str) -> ScannerResult<(&str, &str)> {
    credentials.split_once(':').ok_or_else(|| {
        ScannerError::config("Credentials must be given as <username:password>")
    })
}

fn basic_auth_header(credentials: &str) -> ScannerResult<String> {
    let (user, pass) = split_credentials(credentials)?;
    Ok(format!("Basic {}", BASE64.encode(format!("{}:{}", user, pass))))
}

/// host:port without a scheme means an HTTP proxy
fn normalize_proxy(proxy: &str) -> String {
    if proxy.contains("://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}
