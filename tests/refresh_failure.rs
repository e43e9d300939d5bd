mod common;

use std::time::Duration;

use auth_gateway::token::{CREDENTIAL_KEYS, CredentialStore};
use auth_gateway::{AuthGateway, Config, Error, RequestOptions};
use common::{harness, harness_with_config, logged_in, mount_refresh};
use reqwest::StatusCode;
use serde_json::{Value, json};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_always_unauthorized(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
}

async fn fetch(gateway: &AuthGateway, url: &str) -> Result<Value, Error> {
    gateway.get(url, RequestOptions::new()).await
}

#[tokio::test]
async fn failed_refresh_rejects_everyone_and_redirects_once() {
    let server = MockServer::start().await;
    mount_always_unauthorized(&server).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401)
            .set_body_json(json!({"detail": "refresh token revoked"}))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let h = harness(&server.uri(), logged_in("expired"));
    let (a, b, c) = tokio::join!(
        fetch(&h.gateway, "/tickets"),
        fetch(&h.gateway, "/users"),
        fetch(&h.gateway, "/stats"),
    );

    for res in [a, b, c] {
        match res {
            Err(Error::Refresh(failure)) => {
                assert_eq!(failure.status, Some(StatusCode::UNAUTHORIZED));
                assert!(failure.message.contains("revoked"));
            }
            other => panic!("expected refresh failure, got {:?}", other),
        }
    }

    for key in CREDENTIAL_KEYS {
        assert_eq!(h.store.get(key), None, "slot '{}' should be cleared", key);
    }
    assert_eq!(h.navigator.redirects(), vec!["/login".to_string()]);
    assert!(!h.gateway.context().gate().is_refreshing());
}

#[tokio::test]
async fn redirect_goes_to_login_under_mount_point() {
    let server = MockServer::start().await;
    mount_always_unauthorized(&server).await;
    mount_refresh(&server, ResponseTemplate::new(500), 1).await;

    let mut config = Config::from_values(server.uri());
    config.mount_path = "/mini".into();
    let h = harness_with_config(config, logged_in("expired"));

    let err = fetch(&h.gateway, "/profile").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(h.navigator.redirects(), vec!["/mini/login".to_string()]);
}

#[tokio::test]
async fn refresh_without_access_token_is_a_failure() {
    let server = MockServer::start().await;
    mount_always_unauthorized(&server).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})),
        1,
    )
    .await;

    let h = harness(&server.uri(), logged_in("expired"));
    let err = fetch(&h.gateway, "/tickets").await.unwrap_err();

    assert!(matches!(err, Error::Refresh(ref f) if f.message.contains("invalid refresh response")));
    assert!(h.store.is_empty());
    assert_eq!(h.navigator.redirects().len(), 1);
}

#[tokio::test]
async fn a_new_cycle_may_start_after_failure() {
    let server = MockServer::start().await;
    mount_always_unauthorized(&server).await;
    mount_refresh(&server, ResponseTemplate::new(401), 2).await;

    let h = harness(&server.uri(), logged_in("expired"));
    assert!(fetch(&h.gateway, "/tickets").await.is_err());

    // Without a token the next request goes out bare, hits 401, and tries again.
    assert!(fetch(&h.gateway, "/tickets").await.is_err());
    assert_eq!(h.navigator.redirects().len(), 2);
}
