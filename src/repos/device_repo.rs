/*
 * Responsibility
 * - Trusted device rows (devices table)
 * - Read-then-write only; count is not guarded against concurrent inserts
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::{Device, DeviceAttributes};
use crate::repos::error::RepoResult;

#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get(&self, device_id: &str) -> RepoResult<Option<Device>>;

    // Insert or overwrite by device_id.
    async fn put(&self, device: Device) -> RepoResult<()>;

    // Returns true when a row was removed.
    async fn delete(&self, device_id: &str) -> RepoResult<bool>;

    async fn count_by_user(&self, user_id: &str) -> RepoResult<u64>;

    async fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Device>>;
}

#[derive(Debug, FromRow)]
struct DeviceRow {
    device_id: String,
    user_id: String,
    last_seen: DateTime<Utc>,
    device_type: Option<String>,
    os_name: Option<String>,
    browser_name: Option<String>,
    locale: Option<String>,
    time_zone: Option<String>,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            device_id: row.device_id,
            user_id: row.user_id,
            last_seen: row.last_seen,
            attributes: DeviceAttributes {
                device_type: row.device_type,
                os_name: row.os_name,
                browser_name: row.browser_name,
                locale: row.locale,
                time_zone: row.time_zone,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgDeviceStore {
    pool: PgPool,
}

impl PgDeviceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PgDeviceStore {
    async fn get(&self, device_id: &str) -> RepoResult<Option<Device>> {
        let row = sqlx::query_as::<_, DeviceRow>(
            r#"
            SELECT
                device_id, user_id, last_seen,
                device_type, os_name, browser_name, locale, time_zone
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Device::from))
    }

    async fn put(&self, device: Device) -> RepoResult<()> {
        let attrs = device.attributes;
        sqlx::query(
            r#"
            INSERT INTO devices (
                device_id, user_id, last_seen,
                device_type, os_name, browser_name, locale, time_zone
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (device_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                last_seen = EXCLUDED.last_seen,
                device_type = EXCLUDED.device_type,
                os_name = EXCLUDED.os_name,
                browser_name = EXCLUDED.browser_name,
                locale = EXCLUDED.locale,
                time_zone = EXCLUDED.time_zone
            "#,
        )
        .bind(device.device_id)
        .bind(device.user_id)
        .bind(device.last_seen)
        .bind(attrs.device_type)
        .bind(attrs.os_name)
        .bind(attrs.browser_name)
        .bind(attrs.locale)
        .bind(attrs.time_zone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, device_id: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_user(&self, user_id: &str) -> RepoResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM devices WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Device>> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            r#"
            SELECT
                device_id, user_id, last_seen,
                device_type, os_name, browser_name, locale, time_zone
            FROM devices
            WHERE user_id = $1
            ORDER BY last_seen DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Device::from).collect())
    }
}
