//! Database models for accounts.

use crate::api::models::accounts::{AccountStatus, AccountUpdate, Role};
use crate::types::AccountId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Database request for creating a new account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
}

/// Database request for updating an account's role and status
#[derive(Debug, Clone, Default)]
pub struct AccountUpdateDBRequest {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

impl From<AccountUpdate> for AccountUpdateDBRequest {
    fn from(api: AccountUpdate) -> Self {
        Self {
            role: api.role,
            status: api.status,
        }
    }
}
