use wiremock::matchers::{body_json_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn fast_policy() -> FetchPolicy {
    FetchPolicy {
        timeout_secs: 5,
        max_retries: 0,
    }
}

fn test_client() -> ToriClient {
    ToriClient::with_timing(0, 0).expect("failed to build test ToriClient")
}

fn login(enabled: bool, username: &str, password: &str) -> LoginSettings {
    LoginSettings {
        enabled,
        username: username.to_owned(),
        password: password.to_owned(),
    }
}

#[test]
fn fetch_policy_reads_settings_snapshot() {
    let mut settings = Settings::default();
    settings.request_timeout_seconds = 42;
    settings.max_retries = 7;
    let policy = FetchPolicy::from(&settings);
    assert_eq!(policy.timeout_secs, 42);
    assert_eq!(policy.max_retries, 7);
}

#[tokio::test]
async fn login_disabled_returns_false_without_requests() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 and the assertion on
    // received_requests below would catch it.
    let client = test_client();
    let ok = client
        .login_at(
            fast_policy(),
            &server.uri(),
            &format!("{}/api/auth/login", server.uri()),
            &login(false, "user", "pass"),
        )
        .await;
    assert!(!ok);
    assert!(!client.is_logged_in());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn login_with_blank_credentials_returns_false() {
    let server = MockServer::start().await;
    let client = test_client();
    let ok = client
        .login_at(
            fast_policy(),
            &server.uri(),
            &format!("{}/api/auth/login", server.uri()),
            &login(true, "  ", ""),
        )
        .await;
    assert!(!ok);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn successful_login_sets_logged_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json_string(
            r#"{"username":"matti","password":"salasana"}"#,
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client();
    let ok = client
        .login_at(
            fast_policy(),
            &format!("{}/", server.uri()),
            &format!("{}/api/auth/login", server.uri()),
            &login(true, "matti", "salasana"),
        )
        .await;
    assert!(ok);
    assert!(client.is_logged_in());
}

#[tokio::test]
async fn failed_login_leaves_client_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client();
    let ok = client
        .login_at(
            fast_policy(),
            &format!("{}/", server.uri()),
            &format!("{}/api/auth/login", server.uri()),
            &login(true, "matti", "wrong"),
        )
        .await;
    assert!(!ok);
    assert!(!client.is_logged_in());
}
