//! JWT access and refresh token issuance and verification.
//!
//! Both token kinds are HS256-signed with distinct secrets, so a refresh token never passes
//! access verification and vice versa. Expiry is strict: a token is accepted only while
//! `now < exp`, with no leeway.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{api::models::accounts::Role, errors::Error, types::AccountId};

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: AccountId, // Subject (account ID)
    pub email: String,
    pub role: Role,
    pub iat: i64, // Issued at
    pub exp: i64, // Expiration time
}

/// Claims carried by a refresh token. No role: the current role is re-read on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: AccountId,
    pub iat: i64,
    pub exp: i64,
}

trait Expiring {
    fn exp(&self) -> i64;
}

impl Expiring for AccessClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl Expiring for RefreshClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// Issues and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(access_secret: &str, refresh_secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Lifetime of newly issued access tokens
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue_access_token(&self, account_id: AccountId, email: &str, role: Role) -> Result<String, Error> {
        self.issue_access_token_at(account_id, email, role, Utc::now())
    }

    pub fn issue_access_token_at(&self, account_id: AccountId, email: &str, role: Role, now: DateTime<Utc>) -> Result<String, Error> {
        let claims = AccessClaims {
            sub: account_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: expiry(now, self.access_ttl),
        };
        sign(&claims, &self.access_encoding)
    }

    pub fn issue_refresh_token(&self, account_id: AccountId) -> Result<String, Error> {
        self.issue_refresh_token_at(account_id, Utc::now())
    }

    pub fn issue_refresh_token_at(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<String, Error> {
        let claims = RefreshClaims {
            sub: account_id,
            iat: now.timestamp(),
            exp: expiry(now, self.refresh_ttl),
        };
        sign(&claims, &self.refresh_encoding)
    }

    /// Verify an access token. Every failure collapses to [`Error::InvalidToken`].
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, Error> {
        self.verify_access_token_at(token, Utc::now())
    }

    pub fn verify_access_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, Error> {
        verify(token, &self.access_decoding, now)
    }

    /// Verify a refresh token. Every failure collapses to [`Error::InvalidToken`].
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, Error> {
        self.verify_refresh_token_at(token, Utc::now())
    }

    pub fn verify_refresh_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<RefreshClaims, Error> {
        verify(token, &self.refresh_decoding, now)
    }
}

/// Decode a token's claims without checking the signature or expiry.
///
/// For diagnostics only. Never use the result to make an authorization decision.
pub fn decode_unverified<C: DeserializeOwned>(token: &str) -> Option<C> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<C>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> i64 {
    now.timestamp().saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

fn sign<C: Serialize>(claims: &C, key: &EncodingKey) -> Result<String, Error> {
    encode(&Header::new(Algorithm::HS256), claims, key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

fn verify<C: DeserializeOwned + Expiring>(token: &str, key: &DecodingKey, now: DateTime<Utc>) -> Result<C, Error> {
    // Expiry is checked below against the supplied clock, without the library's leeway
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = false;

    let claims = decode::<C>(token, key, &validation)
        .map_err(|e| {
            debug!("Token rejected: {e}");
            Error::InvalidToken
        })?
        .claims;

    if now.timestamp() >= claims.exp() {
        debug!("Token rejected: expired");
        return Err(Error::InvalidToken);
    }

    Ok(claims)
}
