/*
 * Responsibility
 * - Append-only audit_events table
 * - Secondary lookup by resource for the activity log
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::models::{AuditAction, AuditEvent};
use crate::repos::error::{RepoError, RepoResult};

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: AuditEvent) -> RepoResult<()>;

    // Newest first.
    async fn list_by_resource(&self, resource: &str, limit: u32) -> RepoResult<Vec<AuditEvent>>;
}

#[derive(Debug, FromRow)]
struct AuditRow {
    user_id: String,
    ts: i64,
    action: String,
    resource: String,
    details: serde_json::Value,
}

impl TryFrom<AuditRow> for AuditEvent {
    type Error = RepoError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let action = AuditAction::parse(&row.action)
            .ok_or_else(|| RepoError::Corrupt(format!("audit action {:?}", row.action)))?;

        Ok(Self {
            user_id: row.user_id,
            ts: row.ts,
            action,
            resource: row.resource,
            details: row.details,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, event: AuditEvent) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (user_id, ts, action, resource, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.user_id)
        .bind(event.ts)
        .bind(event.action.as_str())
        .bind(event.resource)
        .bind(event.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_resource(&self, resource: &str, limit: u32) -> RepoResult<Vec<AuditEvent>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT user_id, ts, action, resource, details
            FROM audit_events
            WHERE resource = $1
            ORDER BY ts DESC, event_id DESC
            LIMIT $2
            "#,
        )
        .bind(resource)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEvent::try_from).collect()
    }
}
