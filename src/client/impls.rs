use std::sync::Arc;

use jiff::Timestamp;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    AuthGateway,
    config::Config,
    errors::{Error, ErrorPayload},
    navigation::Navigator,
    request::{RequestOptions, RequestSpec, resolve_url},
    request_context::RequestDispatchContext,
    token::{Credential, CredentialStore, CredentialVault},
    types::LoginResponse,
};

impl AuthGateway {
    /// Create a new AuthGateway
    /// # Arguments
    /// * `config` - Endpoint and expiry configuration, typically from `Config::from_file` or `Config::from_env`.
    /// * `store` - Where the four credential slots are persisted.
    /// * `navigator` - Receives the login redirect when a refresh fails for good.
    pub fn new(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        let context = RequestDispatchContext::build(config, store, navigator)?;
        info!(
            "gateway ready: base='{}' refresh='{}'",
            context.base_url(),
            context.refresh_url()
        );
        Ok(Self { context })
    }

    pub fn context(&self) -> &RequestDispatchContext {
        &self.context
    }

    pub fn vault(&self) -> &CredentialVault {
        self.context.vault()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.context.vault().load()
    }

    /// Stores the credential produced by a successful login. It is assumed
    /// valid for the login window.
    pub fn establish_session(&self, login: LoginResponse) -> Result<Credential, Error> {
        let credential = Credential::issue(
            login.access_token,
            login.token_type,
            login.user_role,
            Timestamp::now(),
            self.context.policy().login_window,
        )?;
        self.context.vault().persist(&credential)?;
        info!(
            "session established: role='{}' expires_at={:?}",
            credential.role, credential.expires_at
        );
        Ok(credential)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, Error> {
        self.request(RequestSpec::new(Method::GET, url).with_options(options))
            .await
    }

    pub async fn post<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let spec = RequestSpec::new(Method::POST, url)
            .with_body(serde_json::to_value(body)?)
            .with_options(options);
        self.request(spec).await
    }

    pub async fn put<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let spec = RequestSpec::new(Method::PUT, url)
            .with_body(serde_json::to_value(body)?)
            .with_options(options);
        self.request(spec).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, Error> {
        self.request(RequestSpec::new(Method::DELETE, url).with_options(options))
            .await
    }

    /// Issues `spec` with the stored bearer attached and decodes the JSON payload.
    ///
    /// A first 401 is repaired by a shared refresh cycle and the request is
    /// re-issued once with the new token. A second 401, any other non-2xx
    /// status, or a transport error is returned as-is.
    pub async fn request<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, Error> {
        let token = self.context.vault().access_token();
        let response = self.dispatch(&spec, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return finish(&spec, response).await;
        }

        warn!(
            "request unauthorized: method={} url='{}' status=401; awaiting refresh",
            spec.method, spec.url
        );
        let token = self.await_refresh().await?;

        let response = self.dispatch(&spec, Some(&token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(
                "request rejected again after refresh: method={} url='{}' status=401",
                spec.method, spec.url
            );
        }
        finish(&spec, response).await
    }

    async fn dispatch(&self, spec: &RequestSpec, token: Option<&str>) -> Result<Response, Error> {
        let url = resolve_url(self.context.base_url(), &spec.url);
        let mut headers = HeaderMap::new();
        for (name, value) in &spec.options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidRequest(format!("header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::InvalidRequest(format!("value for header '{}': {}", name, e))
            })?;
            headers.append(name, value);
        }
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| {
                    Error::InvalidRequest(format!("stored access token is not a header value: {}", e))
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .context
            .http_client()
            .request(spec.method.clone(), &url)
            .headers(headers);
        if !spec.options.query.is_empty() {
            builder = builder.query(&spec.options.query);
        }
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }

        debug!(
            "dispatch: method={} url='{}' bearer={}",
            spec.method,
            url,
            token.is_some()
        );
        Ok(builder.send().await?)
    }
}

async fn finish<T: DeserializeOwned>(spec: &RequestSpec, response: Response) -> Result<T, Error> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return decode(&body);
    }
    let payload = ErrorPayload::from_bytes(&body);
    debug!(
        "request failed: method={} url='{}' status={} body='{}'",
        spec.method, spec.url, status, payload
    );
    Err(Error::Http(status, payload))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_success_body_decodes_as_null() {
        let value: Value = decode(b"").unwrap();
        assert_eq!(value, Value::Null);
        let unit: Option<String> = decode(b" ").unwrap();
        assert!(unit.is_none());
    }

    #[test]
    fn json_body_decodes_into_target() {
        #[derive(serde::Deserialize)]
        struct Ticket {
            id: u32,
        }
        let tickets: Vec<Ticket> = decode(br#"[{"id":1},{"id":2}]"#).unwrap();
        assert_eq!(tickets.iter().map(|t| t.id).sum::<u32>(), 3);
    }
}
