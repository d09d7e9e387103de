//! Audit trail for security-relevant account operations.
//!
//! Handlers build an [`AuditEntry`] and hand it to [`emit`], which records it on a background
//! task. The request never waits on the sink, and a failing sink is only logged.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{AccountId, AuditEntryId, abbrev_uuid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Register,
    Login,
    UpdateAccount,
    DeleteAccount,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Register => "REGISTER",
            AuditAction::Login => "LOGIN",
            AuditAction::UpdateAccount => "UPDATE_ACCOUNT",
            AuditAction::DeleteAccount => "DELETE_ACCOUNT",
        }
    }
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Account that performed the action, if known
    pub actor_id: Option<AccountId>,
    pub action: AuditAction,
    /// Affected resource, e.g. `accounts/<id>`
    pub resource: String,
    /// Snapshot of the relevant fields. Never contains credentials.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor_id: Option<AccountId>, action: AuditAction, resource: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            actor_id,
            action,
            resource: resource.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Destination for audit records.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()>;
}

/// Record an entry in the background, logging (not propagating) any sink failure.
pub fn emit(sink: &Arc<dyn AuditSink>, entry: AuditEntry) -> tokio::task::JoinHandle<()> {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.record(&entry).await {
            warn!(action = entry.action.as_str(), resource = %entry.resource, "Failed to record audit entry: {e:#}");
        }
    })
}

/// Writes audit records to the `audit_logs` table.
#[derive(Clone)]
pub struct PostgresAuditSink {
    db: PgPool,
}

impl PostgresAuditSink {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        let id: AuditEntryId = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, resource, payload, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(&entry.resource)
        .bind(&entry.payload)
        .bind(entry.timestamp)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Emits audit records as structured log events. Used with the in-memory store.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait::async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        info!(
            target: "audit",
            actor = %entry.actor_id.as_ref().map(abbrev_uuid).unwrap_or_default(),
            action = entry.action.as_str(),
            resource = %entry.resource,
            payload = %entry.payload,
            "audit"
        );
        Ok(())
    }
}

/// Keeps audit records in memory for inspection in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditSink {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Wait until at least `count` entries have been recorded, then return them all.
    /// Returns whatever is present once `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<AuditEntry> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.len() < count && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.entries()
    }
}

#[async_trait::async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }
}
