#![allow(dead_code)]

use std::sync::Arc;

use auth_gateway::token::{ACCESS_TOKEN_KEY, TOKEN_EXPIRATION_KEY, TOKEN_TYPE_KEY, USER_ROLE_KEY};
use auth_gateway::{AuthGateway, Config, MemoryStore, RecordingNavigator};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct Harness {
    pub gateway: AuthGateway,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn harness_with_config(config: Config, store: MemoryStore) -> Harness {
    let store = Arc::new(store);
    let navigator = Arc::new(RecordingNavigator::new());
    let gateway =
        AuthGateway::new(&config, store.clone(), navigator.clone()).expect("gateway builds");
    Harness {
        gateway,
        store,
        navigator,
    }
}

pub fn harness(base_url: &str, store: MemoryStore) -> Harness {
    harness_with_config(Config::from_values(base_url), store)
}

pub fn now_ms() -> i64 {
    jiff::Timestamp::now().as_millisecond()
}

pub fn logged_in(token: &str) -> MemoryStore {
    let expires = (now_ms() + 60_000).to_string();
    MemoryStore::with_slots([
        (ACCESS_TOKEN_KEY, token),
        (TOKEN_TYPE_KEY, "bearer"),
        (USER_ROLE_KEY, "ADMIN"),
        (TOKEN_EXPIRATION_KEY, expires.as_str()),
    ])
}

pub async fn mount_refresh(server: &MockServer, template: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(template)
        .expect(calls)
        .mount(server)
        .await;
}

pub fn refresh_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "access_token": token }))
}
