//! In-memory account store.
//!
//! Stores all accounts in a lock-protected map. Suitable for tests, demos and single-process
//! development runs (`database.type: memory`); everything is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::errors::{DbError, Result};
use crate::db::handlers::AccountStore;
use crate::db::models::accounts::{Account, AccountCreateDBRequest, AccountUpdateDBRequest};
use crate::types::AccountId;

const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_active_unique";

/// In-memory implementation of the [`AccountStore`] trait.
///
/// Soft-deleted accounts are kept in the map (with `deleted_at` set) but are invisible to
/// every lookup, matching the PostgreSQL store.
#[derive(Clone, Default)]
pub struct InMemoryAccounts {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryAccounts {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

#[async_trait::async_trait]
impl AccountStore for InMemoryAccounts {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read();
        Ok(accounts.values().find(|a| !a.is_deleted() && a.email == email).cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let accounts = self.accounts.read();
        Ok(accounts.get(&id).filter(|a| !a.is_deleted()).cloned())
    }

    async fn insert(&self, request: &AccountCreateDBRequest) -> Result<Account> {
        // Uniqueness is checked under the write lock so concurrent inserts cannot both win
        let mut accounts = self.accounts.write();
        if accounts.values().any(|a| !a.is_deleted() && a.email == request.email) {
            return Err(DbError::UniqueViolation {
                constraint: Some(EMAIL_UNIQUE_CONSTRAINT.to_string()),
                table: Some("users".to_string()),
                message: format!("duplicate key value violates unique constraint \"{EMAIL_UNIQUE_CONSTRAINT}\""),
            });
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            phone: request.phone.clone(),
            avatar: None,
            role: request.role,
            status: request.status,
            last_login: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn update_last_login(&self, id: AccountId) -> Result<()> {
        let mut accounts = self.accounts.write();
        let account = accounts.get_mut(&id).filter(|a| !a.is_deleted()).ok_or(DbError::NotFound)?;
        account.last_login = Some(Utc::now());
        Ok(())
    }

    async fn update(&self, id: AccountId, request: &AccountUpdateDBRequest) -> Result<Account> {
        let mut accounts = self.accounts.write();
        let account = accounts.get_mut(&id).filter(|a| !a.is_deleted()).ok_or(DbError::NotFound)?;
        if let Some(role) = request.role {
            account.role = role;
        }
        if let Some(status) = request.status {
            account.status = status;
        }
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn soft_delete(&self, id: AccountId) -> Result<bool> {
        let mut accounts = self.accounts.write();
        match accounts.get_mut(&id).filter(|a| !a.is_deleted()) {
            Some(account) => {
                let now = Utc::now();
                account.deleted_at = Some(now);
                account.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
