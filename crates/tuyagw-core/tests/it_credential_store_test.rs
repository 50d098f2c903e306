//! Integration tests for the token lifecycle against a fake upstream

use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use tuyagw_core::auth::{
    sign, AuthError, CredentialStore, HttpTokenEndpoint, TokenFile, TokenState, TokenStatus,
};
use tuyagw_core::{Credentials, ManualClock};

const NOW: i64 = 1_700_000_000_000;
const MINUTE_MS: i64 = 60_000;

fn creds() -> Credentials {
    Credentials::new("eu", "client123", "secret456")
}

fn token_body(token: &str, refresh: &str, t: i64) -> String {
    serde_json::json!({
        "result": {
            "access_token": token,
            "expire_time": 3600,
            "refresh_token": refresh,
            "uid": "bay1700000000000"
        },
        "success": true,
        "t": t,
        "tid": "0f9a"
    })
    .to_string()
}

fn store(server: &ServerGuard, file: TokenFile) -> CredentialStore {
    let endpoint = HttpTokenEndpoint::new(reqwest::Client::new(), format!("{}/v1.0", server.url()));
    CredentialStore::initialize(
        creds(),
        file,
        Arc::new(endpoint),
        Arc::new(ManualClock::new(NOW)),
    )
}

#[tokio::test]
async fn fresh_process_authenticates_and_persists() {
    //* Given
    let mut server = Server::new_async().await;
    let expected = sign(&creds(), None, NOW);

    let token_mock = server
        .mock("GET", "/v1.0/token?grant_type=1")
        .match_header("client_id", "client123")
        .match_header("sign_method", "HMAC-SHA256")
        .match_header("t", expected.t.as_str())
        .match_header("sign", expected.sign.as_str())
        .match_header("access_token", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("tok-new", "ref-new", NOW))
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tuya-gateway.json");
    let store = store(&server, TokenFile::new(&path));

    //* When
    let headers = store.ensure_valid().await.expect("headers");

    //* Then
    token_mock.assert_async().await;
    assert_eq!(headers.access_token.as_deref(), Some("tok-new"));
    assert_eq!(headers, sign(&creds(), Some("tok-new"), NOW));

    let persisted: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("persisted file"))
            .expect("valid json");
    let sent: serde_json::Value =
        serde_json::from_str(&token_body("tok-new", "ref-new", NOW)).expect("valid json");
    assert_eq!(persisted, sent);
}

#[tokio::test]
async fn persisted_valid_token_needs_no_network() {
    //* Given
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("auth.json");
    std::fs::write(&path, token_body("tok-cached", "ref-cached", NOW - 10 * MINUTE_MS))
        .expect("seed");

    //* When
    let store = store(&server, TokenFile::new(&path));
    let headers = store.ensure_valid().await.expect("headers");

    //* Then
    token_mock.assert_async().await;
    assert_eq!(headers, sign(&creds(), Some("tok-cached"), NOW));
    assert_eq!(
        store.status().await,
        TokenStatus::Valid {
            remaining_secs: 50 * 60
        }
    );
}

#[tokio::test]
async fn persisted_stale_token_is_renewed_with_refresh_token() {
    //* Given
    let mut server = Server::new_async().await;
    let grant_mock = server
        .mock("GET", "/v1.0/token?grant_type=1")
        .expect(0)
        .create_async()
        .await;
    let refresh_mock = server
        .mock("GET", "/v1.0/token/ref-cached")
        .match_header("sign", sign(&creds(), None, NOW).sign.as_str())
        .match_header("access_token", Matcher::Missing)
        .with_status(200)
        .with_body(token_body("tok-renewed", "ref-renewed", NOW))
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("auth.json");
    std::fs::write(&path, token_body("tok-cached", "ref-cached", NOW - 120 * MINUTE_MS))
        .expect("seed");

    let store = store(&server, TokenFile::new(&path));
    assert_eq!(store.status().await, TokenStatus::Stale);

    //* When
    let headers = store.ensure_valid().await.expect("headers");

    //* Then
    refresh_mock.assert_async().await;
    grant_mock.assert_async().await;
    assert_eq!(headers.access_token.as_deref(), Some("tok-renewed"));

    let reloaded = TokenFile::new(&path).load().expect("persisted record");
    let token = TokenState::from_record(reloaded)
        .token()
        .cloned()
        .expect("token");
    assert_eq!(token.access_token, "tok-renewed");
    assert_eq!(token.refresh_token.as_deref(), Some("ref-renewed"));
}

#[tokio::test]
async fn upstream_401_surfaces_error_and_keeps_no_token() {
    //* Given
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("GET", "/v1.0/token?grant_type=1")
        .with_status(401)
        .with_body(r#"{"code":1004,"msg":"sign invalid","success":false}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("auth.json");
    let store = store(&server, TokenFile::new(&path));

    //* When
    let result = store.ensure_valid().await;

    //* Then
    token_mock.assert_async().await;
    match result {
        Err(AuthError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("sign invalid"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(store.status().await, TokenStatus::NoToken);
    assert!(!path.exists());
}

#[tokio::test]
async fn success_false_with_200_is_an_auth_error() {
    //* Given
    let mut server = Server::new_async().await;
    let _token_mock = server
        .mock("GET", "/v1.0/token?grant_type=1")
        .with_status(200)
        .with_body(r#"{"code":1004,"msg":"sign invalid","success":false,"t":1700000000000}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = store(&server, TokenFile::new(dir.path().join("auth.json")));

    //* When
    let result = store.ensure_valid().await;

    //* Then
    assert!(matches!(
        result,
        Err(AuthError::Rejected {
            code: Some(1004),
            ..
        })
    ));
    assert_eq!(store.status().await, TokenStatus::NoToken);
}

#[tokio::test]
async fn failed_renewal_keeps_the_stale_token() {
    //* Given
    let mut server = Server::new_async().await;
    let refresh_mock = server
        .mock("GET", "/v1.0/token/ref-cached")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("auth.json");
    let seeded = token_body("tok-cached", "ref-cached", NOW - 120 * MINUTE_MS);
    std::fs::write(&path, &seeded).expect("seed");
    let store = store(&server, TokenFile::new(&path));

    //* When
    let first = store.ensure_valid().await;
    let second = store.ensure_valid().await;

    //* Then
    refresh_mock.assert_async().await;
    assert!(matches!(first, Err(AuthError::Status { status: 503, .. })));
    assert!(second.is_err());
    assert_eq!(store.status().await, TokenStatus::Stale);
    assert_eq!(std::fs::read_to_string(&path).expect("file"), seeded);
}
