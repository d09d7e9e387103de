use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::accounts::{AccountResponse, Role};

/// Request to register a new account.
///
/// Required fields default to empty so that a missing field is reported as a validation error
/// rather than a body deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address (must be unique among live accounts)
    #[serde(default)]
    pub email: String,
    /// Password (will be hashed)
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    /// Role for the new account. Defaults to `PATIENT`.
    pub role: Option<Role>,
}

/// Request to login
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request to exchange a refresh token for a new token pair
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Identity plus a fresh token pair, returned by register, login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: AccountResponse,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Generic success response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

