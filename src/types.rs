use serde::Deserialize;

/// Body returned by the refresh endpoint. Only `access_token` is required.
#[derive(Clone, Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
}

/// Token payload handed over by the login flow once the user is authenticated.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
}
