use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::errors::Error;
use crate::navigation::Navigator;
use crate::token::{CredentialStore, CredentialVault, ExpiryPolicy, RefreshGate};

const USER_AGENT: &str = concat!("auth-gateway-rust/", env!("CARGO_PKG_VERSION"));

/// Shared context for outbound requests ensuring consistent token/refresh handling.
#[derive(Clone)]
pub struct RequestDispatchContext {
    http_client: Client,
    gate: Arc<RefreshGate>,
    vault: CredentialVault,
    navigator: Arc<dyn Navigator>,
    policy: ExpiryPolicy,
    base_url: String,
    refresh_url: String,
    login_redirect: String,
}

impl RequestDispatchContext {
    pub fn build(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        config.validate()?;
        // The refresh credential lives in an HTTP-only cookie, so the jar must persist.
        let http_client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http_client,
            gate: Arc::new(RefreshGate::new()),
            vault: CredentialVault::new(store),
            navigator,
            policy: config.policy()?,
            base_url: config.base_url.clone(),
            refresh_url: config.refresh_url(),
            login_redirect: config.login_redirect(),
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn gate(&self) -> Arc<RefreshGate> {
        Arc::clone(&self.gate)
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.navigator)
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }

    pub fn login_redirect(&self) -> &str {
        &self.login_redirect
    }
}
