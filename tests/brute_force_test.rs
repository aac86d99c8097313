// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Credential Tester Tests
 * Login success detection, early stop and response classification
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use lonkero_wpscan::http_client::HttpClient;
use lonkero_wpscan::progress::{ChannelProgress, ProgressEvent};
use lonkero_wpscan::scanners::{BruteForceOptions, CredentialBruteForcer};
use lonkero_wpscan::target::WpTarget;
use lonkero_wpscan::{ScanContext, ScannerError};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

const LOGIN_ERROR: &str = r#"<div id="login_error"><strong>ERROR</strong>: Incorrect password.</div>"#;

fn form(req: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&req.body).into_owned().collect()
}

/// Logs in with any password in `valid`, redirecting to whatever
/// redirect_to was sent
fn login_page(valid: &'static [&'static str]) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync {
    move |req: &Request| {
        let fields = form(req);
        let password = fields.get("pwd").map(String::as_str).unwrap_or_default();
        if valid.iter().any(|v| *v == password) {
            ResponseTemplate::new(302).insert_header("Location", fields["redirect_to"].as_str())
        } else {
            ResponseTemplate::new(200).set_body_string(LOGIN_ERROR)
        }
    }
}

fn wordlist(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn bruteforcer(server: &MockServer, max_threads: usize) -> CredentialBruteForcer {
    let ctx = ScanContext::new(HttpClient::new(2000).unwrap(), max_threads);
    CredentialBruteForcer::new(ctx, WpTarget::new(&server.uri()).unwrap())
}

#[tokio::test]
async fn test_finds_password_in_single_wave() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(login_page(&["b"]))
        .mount(&mock_server)
        .await;

    let list = wordlist("a\nb\nc\n");
    let report = bruteforcer(&mock_server, 5)
        .brute_force("admin", list.path(), &BruteForceOptions::default())
        .await
        .unwrap();

    assert_eq!(report.login, "admin");
    assert_eq!(report.password.as_deref(), Some("b"));
    assert!(report.found());
}

#[tokio::test]
async fn test_stops_submitting_after_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(login_page(&["b"]))
        .expect(2)
        .mount(&mock_server)
        .await;

    let list = wordlist("a\nb\nc\nd\n");
    let report = bruteforcer(&mock_server, 1)
        .brute_force("admin", list.path(), &BruteForceOptions::default())
        .await
        .unwrap();

    assert_eq!(report.password.as_deref(), Some("b"));
    assert_eq!(report.attempts, 2);
    assert_eq!(report.invalid, 1);
}

#[tokio::test]
async fn test_random_redirect_per_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(login_page(&["nope"]))
        .mount(&mock_server)
        .await;

    let list = wordlist("a\nb\nc\n");
    bruteforcer(&mock_server, 3)
        .brute_force("admin", list.path(), &BruteForceOptions::default())
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let redirects: Vec<String> = requests
        .iter()
        .map(|req| form(req)["redirect_to"].clone())
        .collect();

    assert_eq!(redirects.len(), 3);
    for redirect in &redirects {
        let token = redirect
            .strip_prefix(&format!("{}/", mock_server.uri()))
            .and_then(|rest| rest.strip_suffix('/'))
            .unwrap();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_uppercase()));
    }
    assert!(requests.iter().all(|req| form(req)["log"] == "admin"));
}

#[tokio::test]
async fn test_redirect_to_other_location_is_not_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/wp-admin/", mock_server.uri()).as_str()),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let list = wordlist("a\nb\nc\n");
    let report = bruteforcer(&mock_server, 2)
        .brute_force("admin", list.path(), &BruteForceOptions::default())
        .await
        .unwrap();

    assert!(!report.found());
    assert_eq!(report.attempts, 3);
    assert_eq!(report.errors, 3);
}

#[tokio::test]
async fn test_empty_wordlist_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(login_page(&["a"]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let list = wordlist("");
    let report = bruteforcer(&mock_server, 5)
        .brute_force("admin", list.path(), &BruteForceOptions::default())
        .await
        .unwrap();

    assert!(!report.found());
    assert_eq!(report.attempts, 0);
}

#[tokio::test]
async fn test_crlf_wordlist_lines_are_stripped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(login_page(&["letmein"]))
        .mount(&mock_server)
        .await;

    let list = wordlist("password\r\nletmein\r\n");
    let report = bruteforcer(&mock_server, 5)
        .brute_force("admin", list.path(), &BruteForceOptions::default())
        .await
        .unwrap();

    assert_eq!(report.password.as_deref(), Some("letmein"));
}

#[tokio::test]
async fn test_server_errors_are_counted_not_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let report = bruteforcer(&mock_server, 2)
        .brute_force_passwords(
            "admin",
            vec!["a".to_string(), "b".to_string()],
            &BruteForceOptions::default(),
        )
        .await
        .unwrap();

    assert!(!report.found());
    assert_eq!(report.errors, 2);
}

#[tokio::test]
async fn test_passwords_only_reach_opted_in_channel() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(login_page(&["b"]))
        .mount(&mock_server)
        .await;

    let (sink, mut receiver) = ChannelProgress::new();
    let ctx = ScanContext::new(HttpClient::new(2000).unwrap(), 1).with_progress(Arc::new(sink));
    let bruteforcer = CredentialBruteForcer::new(ctx, WpTarget::new(&mock_server.uri()).unwrap());

    let quiet = BruteForceOptions::default();
    bruteforcer
        .brute_force_passwords("admin", vec!["a".to_string(), "b".to_string()], &quiet)
        .await
        .unwrap();
    assert!(receiver.try_recv().is_err());

    let verbose = BruteForceOptions {
        verbose: true,
        ..Default::default()
    };
    bruteforcer
        .brute_force_passwords("admin", vec!["a".to_string(), "b".to_string()], &verbose)
        .await
        .unwrap();

    let mut lines = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let ProgressEvent::Message(line) = event {
            lines.push(line);
        }
    }
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Incorrect"));
    assert!(lines[1].contains("[SUCCESS]"));
    assert!(lines[1].contains("Password: b"));
}

#[tokio::test]
async fn test_brute_force_aborts_when_target_down() {
    let ctx = ScanContext::new(HttpClient::new(1000).unwrap(), 5);
    let bruteforcer =
        CredentialBruteForcer::new(ctx.clone(), WpTarget::new("http://127.0.0.1:9/").unwrap());

    let passwords: Vec<String> = (0..30).map(|i| format!("password{}", i)).collect();
    let err = bruteforcer
        .brute_force_passwords("admin", passwords, &BruteForceOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ScannerError::TargetDown { failures } if failures >= 10));
    assert!(ctx.health.failure_count() < 30);
}

#[tokio::test]
async fn test_late_success_in_same_wave_is_ignored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .respond_with(login_page(&["a", "b", "c"]))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (sink, mut receiver) = ChannelProgress::new();
    let ctx = ScanContext::new(HttpClient::new(2000).unwrap(), 3).with_progress(Arc::new(sink));
    let bruteforcer = CredentialBruteForcer::new(ctx, WpTarget::new(&mock_server.uri()).unwrap());

    let options = BruteForceOptions {
        verbose: true,
        show_progression: true,
        ..Default::default()
    };
    let report = bruteforcer
        .brute_force_passwords(
            "admin",
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            &options,
        )
        .await
        .unwrap();

    assert!(matches!(report.password.as_deref(), Some("a" | "b" | "c")));
    assert_eq!(report.attempts, 3);
    assert_eq!(report.invalid, 0);
    assert_eq!(report.errors, 0);

    let mut successes = 0;
    let mut advanced = 0;
    while let Ok(event) = receiver.try_recv() {
        match event {
            ProgressEvent::Message(line) if line.contains("[SUCCESS]") => successes += 1,
            ProgressEvent::Advanced => advanced += 1,
            _ => {}
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(advanced, 1);
}
