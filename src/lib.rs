//! Authenticated request gateway: bearer attachment plus single-flight
//! token refresh shared by every request that hits a 401.

mod client;
pub mod config;
pub mod errors;
pub mod navigation;
pub mod request;
pub mod request_context;
pub mod telemetry;
pub mod token;
pub mod types;

pub use client::AuthGateway;
pub use config::Config;
pub use errors::{Error, ErrorPayload, RefreshFailure};
pub use navigation::{LogNavigator, Navigator, RecordingNavigator};
pub use request::{RequestOptions, RequestSpec};
pub use token::{Credential, CredentialStore, CredentialVault, FileStore, MemoryStore};
pub use types::{LoginResponse, RefreshResponse};

#[cfg(test)]
mod tests;
