//! # hms: authentication and access control for a hospital management backend
//!
//! Accounts register and log in with email and password, receive a short-lived access token and
//! a longer-lived refresh token, and are authorized by role. Administrators can change an
//! account's role or status and soft-delete accounts, within the limits of the role hierarchy.
//!
//! ## Layout
//!
//! - [`auth`]: password hashing and policy, tokens, role permissions, the auth gateway
//! - [`db`]: the [`AccountStore`](db::handlers::AccountStore) trait with PostgreSQL and in-memory backends
//! - [`audit`]: fire-and-forget audit trail of security-relevant actions
//! - [`api`]: axum handlers and request/response models
//! - [`config`]: YAML + environment configuration via figment
//! - [`errors`]: the service error type and its HTTP mapping
//!
//! ## Storage
//!
//! With `database.type: postgres` (or `DATABASE_URL` set) accounts and audit entries live in
//! PostgreSQL and migrations run on startup. Otherwise accounts are held in process memory and
//! audit entries go to the log.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

#[cfg(test)]
mod test;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::{
    api::{
        handlers::{accounts, auth as auth_handlers, health},
        models::accounts::{AccountStatus, Role},
    },
    audit::{AuditSink, PostgresAuditSink, TracingAuditSink},
    auth::gateway::AuthGateway,
    config::{CorsOrigin, DatabaseConfig, PoolSettings},
    db::{
        handlers::{AccountStore, Accounts},
        in_memory::InMemoryAccounts,
        models::accounts::AccountCreateDBRequest,
    },
    openapi::ApiDoc,
    types::{AccountId, abbrev_uuid},
};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder().config(config).auth(Arc::new(gateway)).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub auth: Arc<AuthGateway>,
}

/// Get the account database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial super-admin account if it doesn't exist.
///
/// Does nothing without `admin_password`. An existing live account with `admin_email` is left
/// untouched, so restarts are idempotent.
#[instrument(skip_all, fields(email = %config.admin_email))]
pub async fn create_initial_admin_account(config: &Config, gateway: &AuthGateway) -> errors::Result<Option<AccountId>> {
    let Some(password) = config.admin_password.as_deref() else {
        debug!("No admin password configured, skipping admin account creation");
        return Ok(None);
    };

    if let Some(existing) = gateway.accounts().find_by_email(&config.admin_email).await? {
        debug!(account_id = %abbrev_uuid(&existing.id), "Admin account already exists");
        return Ok(Some(existing.id));
    }

    let strength = gateway.hasher().check_strength(password);
    if !strength.is_strong {
        warn!("Configured admin password does not meet the password policy: {}", strength.reasons.join("; "));
    }

    let password_hash = gateway.hash_password(password.to_string()).await?;
    let account = gateway
        .accounts()
        .insert(&AccountCreateDBRequest {
            email: config.admin_email.clone(),
            password_hash,
            first_name: "System".to_string(),
            last_name: "Administrator".to_string(),
            phone: None,
            role: Role::SuperAdmin,
            status: AccountStatus::Active,
        })
        .await?;

    info!(account_id = %abbrev_uuid(&account.id), "Created initial admin account");
    Ok(Some(account.id))
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.cors;

    // A literal "*" is not allowed inside an origin list
    let allow_origin = if cors_config.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: auth and account routes under `/api/v1`, `/health`, the
/// OpenAPI viewer at `/api/docs`, CORS and request tracing.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;

    let api_routes = Router::new()
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/refresh", post(auth_handlers::refresh))
        .route("/auth/me", get(auth_handlers::me))
        .route("/auth/logout", post(auth_handlers::logout))
        .route(
            "/accounts/{id}",
            get(accounts::get_account)
                .patch(accounts::update_account)
                .delete(accounts::delete_account),
        );

    let router = Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

async fn connect_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
        .connect(url)
        .await?;

    Ok(pool)
}

type Storage = (Arc<dyn AccountStore>, Arc<dyn AuditSink>, Option<PgPool>);

/// Connect to the configured backend and run migrations.
async fn setup_storage(config: &Config) -> anyhow::Result<Storage> {
    match &config.database {
        DatabaseConfig::Postgres { url, pool } => {
            info!("Using PostgreSQL account storage");
            let pool = connect_pool(url, pool).await?;
            migrator().run(&pool).await?;

            Ok((
                Arc::new(Accounts::new(pool.clone())),
                Arc::new(PostgresAuditSink::new(pool.clone())),
                Some(pool),
            ))
        }
        DatabaseConfig::Memory => {
            warn!("Using in-memory account storage; accounts are lost on restart");
            Ok((Arc::new(InMemoryAccounts::new()), Arc::new(TracingAuditSink), None))
        }
    }
}

/// Main application struct that owns the router and storage.
///
/// 1. **Create**: [`Application::new`] connects storage, runs migrations and seeds the admin account
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until shutdown
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting with configuration: {:#?}", config.redacted());

        let (accounts, audit, pool) = setup_storage(&config).await?;
        Self::with_storage(config, accounts, audit, pool).await
    }

    /// Create an application over an already constructed store and audit sink
    pub async fn with_storage(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        audit: Arc<dyn AuditSink>,
        pool: Option<PgPool>,
    ) -> anyhow::Result<Self> {
        let gateway = AuthGateway::from_config(&config, accounts, audit)?;
        create_initial_admin_account(&config, &gateway).await?;

        let state = AppState::builder().config(config.clone()).auth(Arc::new(gateway)).build();
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        telemetry::shutdown_telemetry();
        info!("Shutdown complete");

        Ok(())
    }
}
