/*
 * Responsibility
 * - Subscription history rows, keyed by (user_id, created_at)
 * - Newest-first keyset paging with an opaque page token
 */
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::{Subscription, SubscriptionStatus};
use crate::repos::error::{RepoError, RepoResult};

#[derive(Debug, Clone, Default)]
pub struct SubscriptionPage {
    pub rows: Vec<Subscription>,
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    // Rows for `user_id`, newest `created_at` first, starting after `page_token`.
    async fn query_newest_first(
        &self,
        user_id: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> RepoResult<SubscriptionPage>;

    // Flip one row to canceled. Returns false when no such row exists.
    async fn mark_canceled(
        &self,
        user_id: &str,
        created_at: DateTime<Utc>,
        canceled_at: DateTime<Utc>,
    ) -> RepoResult<bool>;
}

/// Page tokens carry the `created_at` of the last row returned.
pub fn encode_page_token(created_at: DateTime<Utc>) -> String {
    URL_SAFE_NO_PAD.encode(created_at.timestamp_micros().to_string())
}

pub fn decode_page_token(token: &str) -> RepoResult<DateTime<Utc>> {
    let raw = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| RepoError::InvalidPageToken)?;
    let micros = std::str::from_utf8(&raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(RepoError::InvalidPageToken)?;

    DateTime::from_timestamp_micros(micros).ok_or(RepoError::InvalidPageToken)
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    user_id: String,
    created_at: DateTime<Utc>,
    status: String,
    canceled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = RepoError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::parse(&row.status)
            .ok_or_else(|| RepoError::Corrupt(format!("subscription status {:?}", row.status)))?;

        Ok(Self {
            user_id: row.user_id,
            created_at: row.created_at,
            status,
            canceled_at: row.canceled_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn query_newest_first(
        &self,
        user_id: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> RepoResult<SubscriptionPage> {
        let before = page_token.map(decode_page_token).transpose()?;

        // One extra row tells us whether another page exists.
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT user_id, created_at, status, canceled_at
            FROM subscriptions
            WHERE user_id = $1
                AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(before)
        .bind(i64::from(page_size) + 1)
        .fetch_all(&self.pool)
        .await?;

        let has_more = rows.len() > page_size as usize;
        let rows = rows
            .into_iter()
            .take(page_size as usize)
            .map(Subscription::try_from)
            .collect::<RepoResult<Vec<_>>>()?;

        let next_page_token = if has_more {
            rows.last().map(|row| encode_page_token(row.created_at))
        } else {
            None
        };

        Ok(SubscriptionPage {
            rows,
            next_page_token,
        })
    }

    async fn mark_canceled(
        &self,
        user_id: &str,
        created_at: DateTime<Utc>,
        canceled_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'canceled',
                canceled_at = $3
            WHERE user_id = $1 AND created_at = $2
            "#,
        )
        .bind(user_id)
        .bind(created_at)
        .bind(canceled_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
