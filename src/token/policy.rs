use std::time::Duration;

use crate::errors::Error;

/// Locally assumed credential lifetimes. The server's 401 stays authoritative.
#[derive(Clone, Debug)]
pub struct ExpiryPolicy {
    /// Lifetime assumed for a credential obtained from the refresh endpoint.
    pub refresh_window: Duration,
    /// Lifetime assumed for a credential established at login, and for renewals.
    pub login_window: Duration,
    /// Proactive refresh fires once less than this remains.
    pub proactive_threshold: Duration,
}

impl ExpiryPolicy {
    pub fn new(
        refresh_window: Duration,
        login_window: Duration,
        proactive_threshold: Duration,
    ) -> Result<Self, Error> {
        if refresh_window.is_zero() {
            return Err(Error::Config("Refresh window must be > 0".into()));
        }
        if login_window.is_zero() {
            return Err(Error::Config("Login window must be > 0".into()));
        }
        if proactive_threshold >= refresh_window {
            return Err(Error::Config(
                "Proactive threshold must be lower than the refresh window".into(),
            ));
        }
        Ok(Self {
            refresh_window,
            login_window,
            proactive_threshold,
        })
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            refresh_window: Duration::from_secs(3 * 60),
            login_window: Duration::from_secs(30 * 24 * 60 * 60),
            proactive_threshold: Duration::from_secs(30),
        }
    }
}
