/*
 * Responsibility
 * - Admin side of the identity-token issuer: global sign-out
 * - The issuer keeps one auth_sessions row per issued session; revoking
 *   every open row invalidates all refresh/access tokens of the account
 */
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::repos::error::RepoResult;

#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    // Invalidate every token issued to `user_id`. Returns sessions revoked.
    async fn global_sign_out(&self, user_id: &str) -> RepoResult<u64>;
}

#[derive(Clone, Debug)]
pub struct PgSessionRevoker {
    pool: PgPool,
}

impl PgSessionRevoker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityAdmin for PgSessionRevoker {
    async fn global_sign_out(&self, user_id: &str) -> RepoResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET revoked_at = $2
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }
}
