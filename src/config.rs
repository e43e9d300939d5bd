//! read gateway configuration from a file, the environment, or explicit values

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Error;
use crate::token::ExpiryPolicy;

const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_REFRESH_WINDOW_SECS: u64 = 3 * 60;
const DEFAULT_LOGIN_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_PROACTIVE_THRESHOLD_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Mount point of the app; the login redirect is `mount_path + login_path`.
    #[serde(default)]
    pub mount_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_refresh_window_secs")]
    pub refresh_window_secs: u64,
    #[serde(default = "default_login_window_secs")]
    pub login_window_secs: u64,
    #[serde(default = "default_proactive_threshold_secs")]
    pub proactive_threshold_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_refresh_window_secs() -> u64 {
    DEFAULT_REFRESH_WINDOW_SECS
}

fn default_login_window_secs() -> u64 {
    DEFAULT_LOGIN_WINDOW_SECS
}

fn default_proactive_threshold_secs() -> u64 {
    DEFAULT_PROACTIVE_THRESHOLD_SECS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Builds a config pointing at `base_url` with every other field defaulted.
    pub fn from_values(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: default_refresh_path(),
            mount_path: String::new(),
            login_path: default_login_path(),
            refresh_window_secs: DEFAULT_REFRESH_WINDOW_SECS,
            login_window_secs: DEFAULT_LOGIN_WINDOW_SECS,
            proactive_threshold_secs: DEFAULT_PROACTIVE_THRESHOLD_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// # ENV Vars
    /// * `GATEWAY_BASE_URL` - API base URL (required)
    /// * `GATEWAY_REFRESH_PATH` - refresh endpoint path, default `/auth/refresh`
    /// * `GATEWAY_MOUNT_PATH` - app mount point, default empty
    /// * `GATEWAY_LOGIN_PATH` - login path under the mount point, default `/login`
    /// * `GATEWAY_TIMEOUT_SECS` - transport timeout, default 30
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("GATEWAY_BASE_URL")
            .map_err(|_| Error::Config("Missing GATEWAY_BASE_URL env var".to_string()))?;
        let mut config = Config::from_values(base_url);
        if let Ok(path) = std::env::var("GATEWAY_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Ok(mount) = std::env::var("GATEWAY_MOUNT_PATH") {
            config.mount_path = mount;
        }
        if let Ok(login) = std::env::var("GATEWAY_LOGIN_PATH") {
            config.login_path = login;
        }
        if let Ok(raw) = std::env::var("GATEWAY_TIMEOUT_SECS") {
            config.timeout_secs = raw.parse().map_err(|_| {
                Error::Config(format!("GATEWAY_TIMEOUT_SECS is not a number: '{}'", raw))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            Error::Config(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        self.policy()?;
        Ok(())
    }

    pub fn policy(&self) -> Result<ExpiryPolicy, Error> {
        ExpiryPolicy::new(
            Duration::from_secs(self.refresh_window_secs),
            Duration::from_secs(self.login_window_secs),
            Duration::from_secs(self.proactive_threshold_secs),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_url(&self) -> String {
        crate::request::resolve_url(&self.base_url, &self.refresh_path)
    }

    /// Full navigation target used when a refresh cycle fails for good.
    pub fn login_redirect(&self) -> String {
        let mount = self.mount_path.trim_end_matches('/');
        let login = self.login_path.trim_start_matches('/');
        format!("{}/{}", mount, login)
    }
}
