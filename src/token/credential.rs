use std::time::Duration;

use jiff::Timestamp;

use crate::errors::Error;

pub const DEFAULT_TOKEN_TYPE: &str = "bearer";
pub const DEFAULT_ROLE: &str = "USER";

/// The bearer access token plus the metadata persisted next to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub role: String,
    /// Locally assumed expiry; `None` when the slot is missing or unreadable.
    pub expires_at: Option<Timestamp>,
}

impl Credential {
    /// Creates a credential that is assumed valid for `window` from `now`.
    pub fn issue(
        access_token: impl Into<String>,
        token_type: Option<String>,
        role: Option<String>,
        now: Timestamp,
        window: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            access_token: access_token.into(),
            token_type: token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            role: role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            expires_at: Some(expiry_after(now, window)?),
        })
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(exp) => now > exp,
            None => true,
        }
    }

    /// Time left before the assumed expiry, or `None` once it has passed.
    pub fn remaining(&self, now: Timestamp) -> Option<Duration> {
        let exp = self.expires_at?;
        let left = exp.as_millisecond() - now.as_millisecond();
        u64::try_from(left).ok().map(Duration::from_millis)
    }

    /// True when the credential is still alive but closer than `threshold` to expiry.
    pub fn needs_refresh(&self, now: Timestamp, threshold: Duration) -> bool {
        match self.remaining(now) {
            Some(left) => !left.is_zero() && left < threshold,
            None => false,
        }
    }
}

pub(crate) fn expiry_after(now: Timestamp, window: Duration) -> Result<Timestamp, Error> {
    let window_ms = i64::try_from(window.as_millis())
        .map_err(|_| Error::Config("Expiry window overflows".into()))?;
    Timestamp::from_millisecond(now.as_millisecond().saturating_add(window_ms))
        .map_err(|e| Error::Config(format!("Expiry out of range: {}", e)))
}
