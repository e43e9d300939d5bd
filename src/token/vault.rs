use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tracing::{debug, info, warn};

use crate::errors::Error;

use super::credential::{Credential, DEFAULT_ROLE, DEFAULT_TOKEN_TYPE, expiry_after};
use super::store::CredentialStore;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const TOKEN_TYPE_KEY: &str = "token_type";
pub const USER_ROLE_KEY: &str = "user_role";
pub const TOKEN_EXPIRATION_KEY: &str = "token_expiration";

pub const CREDENTIAL_KEYS: [&str; 4] = [
    ACCESS_TOKEN_KEY,
    TOKEN_TYPE_KEY,
    USER_ROLE_KEY,
    TOKEN_EXPIRATION_KEY,
];

/// Reads and writes the four credential slots as one unit.
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn CredentialStore>,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Current credential, or `None` when no access token is stored.
    pub fn load(&self) -> Option<Credential> {
        let access_token = self.access_token()?;
        let expires_at = self.store.get(TOKEN_EXPIRATION_KEY).and_then(|raw| {
            raw.trim()
                .parse::<i64>()
                .ok()
                .and_then(|ms| Timestamp::from_millisecond(ms).ok())
        });
        Some(Credential {
            access_token,
            token_type: self
                .store
                .get(TOKEN_TYPE_KEY)
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            role: self
                .store
                .get(USER_ROLE_KEY)
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            expires_at,
        })
    }

    pub fn persist(&self, credential: &Credential) -> Result<(), Error> {
        self.store.set(ACCESS_TOKEN_KEY, &credential.access_token)?;
        self.store.set(TOKEN_TYPE_KEY, &credential.token_type)?;
        self.store.set(USER_ROLE_KEY, &credential.role)?;
        match credential.expires_at {
            Some(exp) => self
                .store
                .set(TOKEN_EXPIRATION_KEY, &exp.as_millisecond().to_string())?,
            None => self.store.clear(&[TOKEN_EXPIRATION_KEY])?,
        }
        debug!(
            "credential persisted: type='{}' role='{}' expires_at={:?}",
            credential.token_type, credential.role, credential.expires_at
        );
        Ok(())
    }

    /// Erases every credential slot.
    pub fn clear(&self) -> Result<(), Error> {
        self.store.clear(&CREDENTIAL_KEYS)?;
        info!("credential cleared");
        Ok(())
    }

    /// Returns the credential while it is within its assumed lifetime.
    /// An expired credential is erased from the store.
    pub fn validate(&self, now: Timestamp) -> Result<Option<Credential>, Error> {
        let Some(credential) = self.load() else {
            return Ok(None);
        };
        if credential.expires_at.is_none() {
            return Ok(None);
        }
        if credential.is_expired(now) {
            warn!("stored credential expired; clearing");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(credential))
    }

    pub fn valid_token(&self, now: Timestamp) -> Result<Option<String>, Error> {
        Ok(self.validate(now)?.map(|c| c.access_token))
    }

    /// Pushes a valid credential's expiry to `now + window`. Returns whether it did.
    pub fn renew(&self, now: Timestamp, window: Duration) -> Result<bool, Error> {
        if self.validate(now)?.is_none() {
            return Ok(false);
        }
        let expires_at = expiry_after(now, window)?;
        self.store
            .set(TOKEN_EXPIRATION_KEY, &expires_at.as_millisecond().to_string())?;
        debug!("credential renewed until {}", expires_at);
        Ok(true)
    }

    /// `extra` plus an `Authorization` entry when a valid token is stored.
    pub fn auth_headers(
        &self,
        now: Timestamp,
        extra: HashMap<String, String>,
    ) -> Result<HashMap<String, String>, Error> {
        let mut headers = extra;
        if let Some(token) = self.valid_token(now)? {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryStore;

    fn at(ms: i64) -> Timestamp {
        Timestamp::from_millisecond(ms).unwrap()
    }

    fn vault_with(slots: &[(&str, &str)]) -> (Arc<MemoryStore>, CredentialVault) {
        let store = Arc::new(MemoryStore::with_slots(slots.iter().copied()));
        let vault = CredentialVault::new(store.clone());
        (store, vault)
    }

    #[test]
    fn persist_writes_all_four_slots() {
        let (store, vault) = vault_with(&[]);
        let cred = Credential::issue(
            "tok",
            Some("bearer".into()),
            Some("ADMIN".into()),
            at(10_000),
            Duration::from_secs(180),
        )
        .unwrap();
        vault.persist(&cred).unwrap();

        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("tok"));
        assert_eq!(store.get(TOKEN_TYPE_KEY).as_deref(), Some("bearer"));
        assert_eq!(store.get(USER_ROLE_KEY).as_deref(), Some("ADMIN"));
        assert_eq!(store.get(TOKEN_EXPIRATION_KEY).as_deref(), Some("190000"));
        assert_eq!(vault.load(), Some(cred));
    }

    #[test]
    fn validate_clears_expired_credential() {
        let (store, vault) = vault_with(&[
            (ACCESS_TOKEN_KEY, "tok"),
            (TOKEN_TYPE_KEY, "bearer"),
            (USER_ROLE_KEY, "USER"),
            (TOKEN_EXPIRATION_KEY, "5000"),
        ]);
        assert!(vault.validate(at(4_000)).unwrap().is_some());
        assert!(vault.validate(at(6_000)).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn token_without_expiry_is_not_valid() {
        let (_store, vault) = vault_with(&[(ACCESS_TOKEN_KEY, "tok")]);
        assert_eq!(vault.access_token().as_deref(), Some("tok"));
        assert_eq!(vault.valid_token(at(0)).unwrap(), None);
    }

    #[test]
    fn renew_extends_only_valid_credentials() {
        let (store, vault) = vault_with(&[
            (ACCESS_TOKEN_KEY, "tok"),
            (TOKEN_EXPIRATION_KEY, "5000"),
        ]);
        let window = Duration::from_secs(30 * 24 * 3600);
        assert!(vault.renew(at(1_000), window).unwrap());
        assert_eq!(
            store.get(TOKEN_EXPIRATION_KEY),
            Some((1_000 + 30 * 24 * 3600 * 1000_i64).to_string())
        );

        let (_store, expired) = vault_with(&[
            (ACCESS_TOKEN_KEY, "tok"),
            (TOKEN_EXPIRATION_KEY, "5000"),
        ]);
        assert!(!expired.renew(at(9_000), window).unwrap());
    }

    #[test]
    fn auth_headers_adds_bearer_when_valid() {
        let (_store, vault) = vault_with(&[
            (ACCESS_TOKEN_KEY, "tok"),
            (TOKEN_EXPIRATION_KEY, "5000"),
        ]);
        let mut extra = HashMap::new();
        extra.insert("X-Source".to_string(), "admin".to_string());

        let headers = vault.auth_headers(at(1_000), extra.clone()).unwrap();
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer tok"));
        assert_eq!(headers.get("X-Source").map(String::as_str), Some("admin"));

        let headers = vault.auth_headers(at(9_000), extra).unwrap();
        assert!(!headers.contains_key("Authorization"));
    }
}
