//! Account store: the persistence boundary the auth gateway depends on.
//!
//! Every lookup excludes soft-deleted rows. A soft-deleted account is invisible to
//! `find_by_email`/`find_by_id` and cannot be updated; its email becomes free for a new
//! registration.

use crate::types::{AccountId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    models::accounts::{Account, AccountCreateDBRequest, AccountUpdateDBRequest},
};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Persistence operations on accounts.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up a live account by exact (case-sensitive) email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Look up a live account by ID
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>>;

    /// Insert a new account. Fails with [`DbError::UniqueViolation`] if a live account already
    /// holds the email.
    async fn insert(&self, request: &AccountCreateDBRequest) -> Result<Account>;

    /// Stamp the last-login time with the current time
    async fn update_last_login(&self, id: AccountId) -> Result<()>;

    /// Change role and/or status. Fails with [`DbError::NotFound`] for missing or deleted rows.
    async fn update(&self, id: AccountId, request: &AccountUpdateDBRequest) -> Result<Account>;

    /// Mark an account as deleted. Returns false if there was no live account to delete.
    async fn soft_delete(&self, id: AccountId) -> Result<bool>;
}

/// PostgreSQL-backed account store
#[derive(Clone)]
pub struct Accounts {
    db: PgPool,
}

impl Accounts {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl AccountStore for Accounts {
    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    #[instrument(skip(self, request), fields(role = %request.role), err)]
    async fn insert(&self, request: &AccountCreateDBRequest) -> Result<Account> {
        // Always generate a new ID for accounts
        let account_id = Uuid::new_v4();

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.phone)
        .bind(request.role)
        .bind(request.status)
        .fetch_one(&self.db)
        .await?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn update_last_login(&self, id: AccountId) -> Result<()> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, id: AccountId, request: &AccountUpdateDBRequest) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE users SET
                role = COALESCE($2, role),
                status = COALESCE($3, status),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.role)
        .bind(request.status)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn soft_delete(&self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
