//! Test utilities for integration testing (available with `test-utils` feature).

use std::sync::Arc;

use axum_test::TestServer;

use crate::{
    Application,
    api::models::accounts::{AccountStatus, Role},
    audit::InMemoryAuditSink,
    auth::password::CredentialHasher,
    config::{Config, DatabaseConfig},
    db::{
        handlers::AccountStore,
        in_memory::InMemoryAccounts,
        models::accounts::{Account, AccountCreateDBRequest},
    },
};

/// Configuration for tests: in-memory storage and cheap argon2 parameters.
pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-access-secret-for-testing-only".to_string()),
        refresh_secret_key: Some("test-refresh-secret-for-testing-only".to_string()),
        ..Default::default()
    };
    config.auth.password.argon2_memory_kib = 4096;
    config.auth.password.argon2_iterations = 1;
    config.auth.password.argon2_parallelism = 1;
    config
}

/// A running test server plus handles on its storage.
pub struct TestApp {
    pub server: TestServer,
    pub accounts: Arc<InMemoryAccounts>,
    pub audit: Arc<InMemoryAuditSink>,
    pub config: Config,
}

impl TestApp {
    /// Insert an account directly into the store, bypassing registration rules.
    pub async fn seed_account(&self, email: &str, password: &str, role: Role, status: AccountStatus) -> Account {
        let hasher = CredentialHasher::new(self.config.auth.password.argon2_params(), self.config.auth.password.policy());
        let password_hash = hasher.hash(password).expect("Failed to hash test password");

        self.accounts
            .insert(&AccountCreateDBRequest {
                email: email.to_string(),
                password_hash,
                first_name: "Test".to_string(),
                last_name: role.to_string(),
                phone: None,
                role,
                status,
            })
            .await
            .expect("Failed to seed test account")
    }

    /// Seed an active account and log it in, returning the account and its access token.
    pub async fn login_as(&self, email: &str, role: Role) -> (Account, String) {
        let password = "Str0ng!Pass";
        let account = self.seed_account(email, password, role, AccountStatus::Active).await;

        let response = self
            .server
            .post("/api/v1/auth/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        let token = body["data"]["access_token"].as_str().expect("access_token in login response").to_string();
        (account, token)
    }
}

pub async fn create_test_app_with_config(config: Config) -> TestApp {
    let accounts = Arc::new(InMemoryAccounts::new());
    let audit = Arc::new(InMemoryAuditSink::new());

    let app = Application::with_storage(config.clone(), accounts.clone(), audit.clone(), None)
        .await
        .expect("Failed to create application");

    TestApp {
        server: app.into_test_server(),
        accounts,
        audit,
        config,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_config(create_test_config()).await
}

/// `Authorization` header value for a bearer token
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
