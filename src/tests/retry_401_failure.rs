use crate::tests::test_support::{capture_logs, drain_logs, harness, now_ms, store_with_token};
use crate::token::{ACCESS_TOKEN_KEY, CredentialStore};
use crate::{Error, RequestOptions};
use reqwest::StatusCode;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn returns_401_after_retry_is_rejected_too() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "not allowed"})))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), store_with_token("stale", now_ms() + 60_000));

    let (lines, guard) = capture_logs();
    let res: Result<Value, _> = h.gateway.get("/tickets", RequestOptions::new()).await;
    drop(guard);

    match res {
        Err(Error::Http(status, payload)) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(payload.as_json(), Some(&json!({"detail": "not allowed"})));
        }
        Err(other) => panic!("expected Error::Http, got {}", other),
        Ok(_) => panic!("expected Error::Http, got Ok"),
    }

    // A rejected retry is not a refresh failure: the session survives.
    assert_eq!(h.store.get(ACCESS_TOKEN_KEY).as_deref(), Some("new"));
    assert!(h.navigator.redirects().is_empty());
    assert!(!h.gateway.context().gate().is_refreshing());

    let logs = drain_logs(lines);
    let warn_count = logs
        .iter()
        .filter(|line| line.contains("WARN") && line.contains("401"))
        .count();
    assert_eq!(
        warn_count, 2,
        "should log a warning for each 401, got {:?}",
        logs
    );
}
