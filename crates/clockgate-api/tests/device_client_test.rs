#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clockgate_api::{DeviceClient, DeviceRequest, Error, Scheme, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn test_config() -> TransportConfig {
    TransportConfig::default()
        .with_scheme(Scheme::Http)
        .with_timeout(Duration::from_secs(5))
}

async fn setup() -> (MockServer, DeviceClient, String) {
    let server = MockServer::start().await;
    let client = DeviceClient::new(test_config()).unwrap();
    let address = server.address().to_string();
    (server, client, address)
}

fn password() -> secrecy::SecretString {
    "hunter2".to_string().into()
}

fn dir_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

// ── Login tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login.fcgi"))
        .and(body_json(json!({ "login": "admin", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "session": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client.login(&address, "admin", &password()).await.unwrap();
    assert_eq!(token, "tok-1");
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login.fcgi"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = client.login(&address, "admin", &password()).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    match err {
        Error::Login { ref message, status } => {
            assert_eq!(status, Some(401));
            assert!(message.contains("401"), "got: {message}");
            assert!(message.contains("bad credentials"), "got: {message}");
        }
        ref other => panic!("expected Login error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_without_session() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "session": "" })))
        .mount(&server)
        .await;

    let result = client.login(&address, "admin", &password()).await;
    assert!(
        matches!(
            result,
            Err(Error::Login { ref message, status: None }) if message.contains("no session")
        ),
        "got: {result:?}"
    );
}

// ── Session validity ────────────────────────────────────────────────

#[tokio::test]
async fn test_session_valid_ignores_payload() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/session_is_valid.fcgi"))
        .and(query_param("session", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    client.session_is_valid(&address, "tok-1").await.unwrap();
}

#[tokio::test]
async fn test_session_invalid_is_http_error() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/session_is_valid.fcgi"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let result = client.session_is_valid(&address, "tok-1").await;
    assert!(matches!(result, Err(Error::Http { status: 401, .. })), "got: {result:?}");
}

// ── Users ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_count_users() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/count_users.fcgi"))
        .and(query_param("session", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 314 })))
        .mount(&server)
        .await;

    assert_eq!(client.count_users(&address, "tok-1").await.unwrap(), 314);
}

#[tokio::test]
async fn test_count_users_rejects_garbage() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/count_users.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": "lots" })))
        .mount(&server)
        .await;

    let result = client.count_users(&address, "tok-1").await;
    assert!(matches!(result, Err(Error::Deserialization { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_load_users_sends_mode_and_body() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/load_users.fcgi"))
        .and(query_param("mode", "671"))
        .and(query_param("session", "tok-1"))
        .and(body_json(json!({ "limit": 10, "offset": 20 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "users": [{ "id": 1 }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .load_users(&address, "tok-1", "671", &json!({ "limit": 10, "offset": 20 }))
        .await
        .unwrap();
    assert_eq!(payload["users"][0]["id"], 1);
}

#[tokio::test]
async fn test_load_users_invalid_json() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/load_users.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{broken"))
        .mount(&server)
        .await;

    let result = client.load_users(&address, "tok-1", "671", &json!({})).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_mutation_without_mode() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/remove_users.fcgi"))
        .and(query_param("session", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .mutate_users(&address, "tok-1", "remove_users.fcgi", None, &json!({ "users": [1] }))
        .await
        .unwrap();
    assert!(resp.ok());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), Some("session=tok-1"));
}

#[tokio::test]
async fn test_mutation_http_error_carries_preview() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/update_users.fcgi"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(500)))
        .mount(&server)
        .await;

    let err = client
        .mutate_users(&address, "tok-1", "update_users.fcgi", Some("671"), &json!({}))
        .await
        .unwrap_err();
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body.len(), 200);
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

// ── Coil ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_coil_paper_returns_raw_payload() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/get_coil_paper.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "Respostas": { "coil_paper": 87 } })),
        )
        .mount(&server)
        .await;

    let payload = client.coil_paper(&address, "tok-1").await.unwrap();
    assert_eq!(payload["Respostas"]["coil_paper"], 87);
}

// ── Transport behaviour ─────────────────────────────────────────────

#[tokio::test]
async fn test_call_returns_non_2xx_without_error() {
    let (server, client, address) = setup().await;

    Mock::given(method("POST"))
        .and(path("/anything.fcgi"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let resp = client
        .call(&address, "/anything.fcgi", DeviceRequest::post_bytes("{}"))
        .await
        .unwrap();
    assert!(!resp.ok());
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text(), "nope");
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let server = MockServer::start().await;
    let config = test_config().with_timeout(Duration::from_millis(200));
    let client = DeviceClient::new(config).unwrap();

    Mock::given(method("POST"))
        .and(path("/login.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "session": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = client
        .login(&server.address().to_string(), "admin", &password())
        .await;
    assert!(matches!(result, Err(Error::Timeout { timeout_ms: 200 })), "got: {result:?}");
}

#[tokio::test]
async fn test_spooled_body_round_trips_and_is_removed() {
    let server = MockServer::start().await;
    let spool_dir = tempfile::tempdir().unwrap();
    let config = TransportConfig {
        spool_threshold: Some(0),
        spool_dir: Some(spool_dir.path().to_path_buf()),
        ..test_config()
    };
    let client = DeviceClient::new(config).unwrap();

    Mock::given(method("POST"))
        .and(path("/update_users.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    // A face photo sized body, well past any inline limit.
    let image = "A".repeat(3 * 1024 * 1024);
    let body = json!({ "users": [{ "cpf": 1, "image": image }] });
    client
        .mutate_users(
            &server.address().to_string(),
            "tok-1",
            "update_users.fcgi",
            Some("671"),
            &body,
        )
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body, serde_json::to_vec(&body).unwrap());
    assert!(dir_is_empty(spool_dir.path()), "spool file left behind");
}

#[tokio::test]
async fn test_spool_file_removed_on_connection_failure() {
    let spool_dir = tempfile::tempdir().unwrap();
    let config = TransportConfig {
        spool_threshold: Some(0),
        spool_dir: Some(spool_dir.path().to_path_buf()),
        ..test_config()
    };
    let client = DeviceClient::new(config).unwrap();

    // Bind then drop a listener to get a port nothing is listening on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = client
        .call(
            &format!("127.0.0.1:{port}"),
            "update_users.fcgi",
            DeviceRequest::post_bytes(vec![b'x'; 128 * 1024]),
        )
        .await;
    assert!(matches!(result, Err(Error::Transport(_))), "got: {result:?}");
    assert!(dir_is_empty(spool_dir.path()), "spool file left behind");
}
