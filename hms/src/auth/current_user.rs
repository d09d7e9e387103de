//! Bearer-token extractor for authenticated handlers.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{instrument, trace};

use crate::{
    AppState,
    api::models::accounts::Role,
    auth::tokens::AccessClaims,
    errors::{Error, Result},
    types::{AccountId, abbrev_uuid},
};

/// Identity of the caller, taken from a verified access token.
///
/// The role is the one the token was issued with. Handlers that need the account's current
/// state re-fetch it from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: AccountId,
    pub email: String,
    pub role: Role,
}

impl From<AccessClaims> for CurrentUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Result<&str> {
    let header = parts.headers.get(AUTHORIZATION).ok_or_else(|| Error::Unauthenticated {
        message: Some("Missing authorization header".to_string()),
    })?;

    let value = header.to_str().map_err(|_| Error::Unauthenticated {
        message: Some("Invalid authorization header".to_string()),
    })?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::Unauthenticated {
            message: Some("Authorization header must use the Bearer scheme".to_string()),
        }),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip_all, err)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?;
        let claims = state.auth.tokens().verify_access_token(token)?;
        trace!(account_id = %abbrev_uuid(&claims.sub), role = %claims.role, "Bearer token verified");

        Ok(claims.into())
    }
}
