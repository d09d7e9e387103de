//! Register, login, identify, logout and refresh.
//!
//! The gateway composes the account store, the credential hasher and the token service. Every
//! expected failure comes back as a typed [`Error`]; the transport maps it to a status code.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument};

use crate::{
    api::models::{
        accounts::{AccountResponse, AccountStatus, Role},
        auth::{AuthResponse, AuthSuccessResponse, LoginRequest, RegisterRequest},
    },
    audit::{self, AuditAction, AuditEntry, AuditSink},
    auth::{current_user::CurrentUser, password::CredentialHasher, tokens::TokenService},
    config::Config,
    db::{
        handlers::AccountStore,
        models::accounts::{Account, AccountCreateDBRequest},
    },
    errors::{Error, Result},
    types::{AccountId, abbrev_uuid},
};

pub struct AuthGateway {
    accounts: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    tokens: TokenService,
    audit: Arc<dyn AuditSink>,
    allow_registration: bool,
}

impl AuthGateway {
    pub fn new(accounts: Arc<dyn AccountStore>, audit: Arc<dyn AuditSink>, hasher: CredentialHasher, tokens: TokenService) -> Self {
        Self {
            accounts,
            hasher,
            tokens,
            audit,
            allow_registration: true,
        }
    }

    /// Build the gateway from configuration. Fails if either signing secret is missing.
    pub fn from_config(config: &Config, accounts: Arc<dyn AccountStore>, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let (Some(access_secret), Some(refresh_secret)) = (&config.secret_key, &config.refresh_secret_key) else {
            return Err(Error::Internal {
                operation: "build auth gateway: secret_key and refresh_secret_key are required".to_string(),
            });
        };

        let hasher = CredentialHasher::new(config.auth.password.argon2_params(), config.auth.password.policy());
        let tokens = TokenService::new(
            access_secret,
            refresh_secret,
            config.auth.access_token_expiry,
            config.auth.refresh_token_expiry,
        );

        Ok(Self::new(accounts, audit, hasher, tokens).with_registration(config.auth.allow_registration))
    }

    pub fn with_registration(mut self, allowed: bool) -> Self {
        self.allow_registration = allowed;
        self
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Create an account and sign it in.
    #[instrument(skip_all, err)]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        if !self.allow_registration {
            return Err(Error::Validation {
                message: "User registration is disabled".to_string(),
            });
        }

        if request.email.is_empty() || request.password.is_empty() || request.first_name.is_empty() || request.last_name.is_empty() {
            return Err(Error::Validation {
                message: "Missing required fields".to_string(),
            });
        }

        if !is_well_formed_email(&request.email) {
            return Err(Error::Validation {
                message: "Invalid email address".to_string(),
            });
        }

        let strength = self.hasher.check_strength(&request.password);
        if !strength.is_strong {
            return Err(Error::WeakPassword {
                reasons: strength.reasons,
            });
        }

        if self.accounts.find_by_email(&request.email).await?.is_some() {
            return Err(Error::UserExists);
        }

        let password_hash = self.hash_password(request.password).await?;

        let create_request = AccountCreateDBRequest {
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            role: request.role.unwrap_or(Role::Patient),
            status: AccountStatus::Active,
        };

        // A concurrent registration can pass the lookup above and lose at the unique index
        let account = self.accounts.insert(&create_request).await.map_err(|e| {
            if e.is_email_conflict() {
                Error::UserExists
            } else {
                Error::Database(e)
            }
        })?;

        info!(account_id = %abbrev_uuid(&account.id), role = %account.role, "Account registered");
        audit::emit(
            &self.audit,
            AuditEntry::new(
                Some(account.id),
                AuditAction::Register,
                format!("accounts/{}", account.id),
                json!({ "email": account.email, "role": account.role }),
            ),
        );

        self.issue(account)
    }

    /// Authenticate with email and password.
    #[instrument(skip_all, err)]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        if request.email.is_empty() || request.password.is_empty() {
            return Err(Error::Validation {
                message: "Email and password required".to_string(),
            });
        }

        // Nothing longer than the policy allows was ever hashed
        if request.password.chars().count() > self.hasher.policy().max_length {
            return Err(Error::InvalidCredentials);
        }

        // Unknown and soft-deleted accounts are indistinguishable from a wrong password
        let account = self
            .accounts
            .find_by_email(&request.email)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if !account.is_active() {
            return Err(Error::UserInactive { status: account.status });
        }

        if !self.verify_password(request.password, account.password_hash.clone()).await? {
            return Err(Error::InvalidCredentials);
        }

        self.accounts.update_last_login(account.id).await?;

        info!(account_id = %abbrev_uuid(&account.id), "Account logged in");
        audit::emit(
            &self.audit,
            AuditEntry::new(Some(account.id), AuditAction::Login, format!("accounts/{}", account.id), json!({})),
        );

        self.issue(account)
    }

    /// Current state of the caller's account, re-read from the store.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn identify(&self, id: AccountId) -> Result<AccountResponse> {
        let account = self.accounts.find_by_id(id).await?.ok_or(Error::UserNotFound)?;
        Ok(account.into())
    }

    /// Acknowledge a logout. Tokens stay valid until they expire.
    pub fn logout(&self, caller: &CurrentUser) -> AuthSuccessResponse {
        info!(account_id = %abbrev_uuid(&caller.id), "Account logged out");
        AuthSuccessResponse {
            message: "Logged out successfully".to_string(),
        }
    }

    /// Exchange a refresh token for a new token pair carrying the account's current role.
    #[instrument(skip_all, err)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        let account = self.accounts.find_by_id(claims.sub).await?.ok_or(Error::InvalidToken)?;
        if !account.is_active() {
            return Err(Error::UserInactive { status: account.status });
        }

        self.issue(account)
    }

    /// Hash a password on a blocking thread to avoid blocking the async runtime
    pub async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password hashing task: {e}"),
            })?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password verification task: {e}"),
            })
    }

    fn issue(&self, account: Account) -> Result<AuthResponse> {
        let access_token = self.tokens.issue_access_token(account.id, &account.email, account.role)?;
        let refresh_token = self.tokens.issue_refresh_token(account.id)?;

        Ok(AuthResponse {
            user: account.into(),
            access_token,
            refresh_token,
            expires_in: self.tokens.access_ttl().as_secs(),
        })
    }
}

fn is_well_formed_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace),
        None => false,
    }
}
