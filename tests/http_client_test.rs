// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - HTTP Client Tests
 * Tests for redirect handling, status-0 failures, timeouts and caching
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use lonkero_wpscan::config::HttpConfig;
use lonkero_wpscan::http_client::{HttpClient, ProbeRequest};
use std::time::Duration;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn test_http_client_get_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Success"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(2000).unwrap();
    let url = format!("{}/test", &mock_server.uri());
    let response = client.get(&url).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "Success");
    assert!(!response.timed_out);
}

#[tokio::test]
async fn test_http_client_posts_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wp-login.php"))
        .and(body_string_contains("log=admin"))
        .and(body_string_contains("pwd=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(2000).unwrap();
    let request = ProbeRequest::post_form(
        format!("{}/wp-login.php", mock_server.uri()),
        vec![
            ("log".to_string(), "admin".to_string()),
            ("pwd".to_string(), "s3cret".to_string()),
        ],
    );
    let response = client.execute(&request).await;

    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_http_client_does_not_follow_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(2000).unwrap();
    let response = client.get(&format!("{}/old", mock_server.uri())).await;

    assert_eq!(response.status_code, 302);
    assert!(response.is_redirect());
    assert_eq!(response.header("Location"), Some("/new"));
}

#[tokio::test]
async fn test_http_client_unreachable_host_is_status_zero() {
    let client = HttpClient::new(1000).unwrap();
    let response = client.get("http://127.0.0.1:9/").await;

    assert_eq!(response.status_code, 0);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_http_client_timeout_flag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(2000).unwrap();
    let request = ProbeRequest::get(format!("{}/slow", mock_server.uri()))
        .with_timeout(Duration::from_millis(100));
    let response = client.execute(&request).await;

    assert_eq!(response.status_code, 0);
    assert!(response.timed_out);
}

#[tokio::test]
async fn test_http_client_caches_only_with_ttl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(ResponseTemplate::new(200).set_body_string("cached"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(2000).unwrap();
    let cached = ProbeRequest::get(format!("{}/cached", mock_server.uri()))
        .with_cache_ttl(Duration::from_secs(60));
    let fresh = ProbeRequest::get(format!("{}/fresh", mock_server.uri()));

    for _ in 0..2 {
        assert_eq!(client.execute(&cached).await.body, "cached");
        assert_eq!(client.execute(&fresh).await.body, "fresh");
    }
}

#[tokio::test]
async fn test_http_client_sends_configured_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "session=abc"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .and(header("user-agent", "custom-agent"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::from_config(&HttpConfig {
        cookie: Some("session=abc".to_string()),
        basic_auth: Some("admin:secret".to_string()),
        user_agent: Some("custom-agent".to_string()),
        ..HttpConfig::default()
    })
    .unwrap();

    let response = client.get(&format!("{}/", mock_server.uri())).await;
    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_http_client_sends_per_request_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/probe"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(2000).unwrap();
    let request = ProbeRequest::get(format!("{}/probe", mock_server.uri()))
        .with_header("X-Requested-With", "XMLHttpRequest");

    assert_eq!(client.execute(&request).await.status_code, 204);
}
