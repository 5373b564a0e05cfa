/*
 * Responsibility
 * - profiles + profile_shares tables
 * - Access lookups used by the RBAC gate (owner, accepted share role)
 * - Share lifecycle: invite (PENDING) -> accept (ACCEPTED) -> revoke (delete)
 */
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::{Profile, ProfileAccess, Role, Share, ShareStatus};
use crate::repos::error::{RepoError, RepoResult};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile_owner(&self, profile_id: &str) -> RepoResult<Option<String>>;

    // Role of an ACCEPTED share for (profile, user); pending invites do not count.
    async fn get_accepted_share(&self, profile_id: &str, user_id: &str)
    -> RepoResult<Option<Role>>;

    async fn create_profile(&self, profile: Profile) -> RepoResult<()>;

    async fn get_profile(&self, profile_id: &str) -> RepoResult<Option<Profile>>;

    // Removes the profile and everything hanging off it.
    async fn delete_profile(&self, profile_id: &str) -> RepoResult<bool>;

    // Owned profiles plus profiles shared with `user_id` and accepted.
    async fn list_accessible(&self, user_id: &str) -> RepoResult<Vec<ProfileAccess>>;

    // Returns false when an invite for (profile, email) already exists.
    async fn create_share(&self, share: Share) -> RepoResult<bool>;

    // Binds a PENDING invite to `user_id`. None when nothing is pending.
    async fn accept_share(
        &self,
        profile_id: &str,
        invitee_email: &str,
        user_id: &str,
    ) -> RepoResult<Option<Share>>;

    async fn delete_share(&self, profile_id: &str, invitee_email: &str) -> RepoResult<bool>;

    async fn list_shares(&self, profile_id: &str) -> RepoResult<Vec<Share>>;
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    profile_id: String,
    owner_id: String,
    name: String,
    birth_date: Option<NaiveDate>,
    relationship: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            profile_id: row.profile_id,
            owner_id: row.owner_id,
            name: row.name,
            birth_date: row.birth_date,
            relationship: row.relationship,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProfileAccessRow {
    #[sqlx(flatten)]
    profile: ProfileRow,
    role: String,
}

#[derive(Debug, FromRow)]
struct ShareRow {
    profile_id: String,
    invitee_email: String,
    invitee_user_id: Option<String>,
    role: String,
    status: String,
    invited_by: String,
    created_at: DateTime<Utc>,
}

fn parse_role(raw: &str) -> RepoResult<Role> {
    Role::parse(raw).ok_or_else(|| RepoError::Corrupt(format!("share role {raw:?}")))
}

impl TryFrom<ShareRow> for Share {
    type Error = RepoError;

    fn try_from(row: ShareRow) -> Result<Self, Self::Error> {
        let status = ShareStatus::parse(&row.status)
            .ok_or_else(|| RepoError::Corrupt(format!("share status {:?}", row.status)))?;

        Ok(Self {
            profile_id: row.profile_id,
            invitee_email: row.invitee_email,
            invitee_user_id: row.invitee_user_id,
            role: parse_role(&row.role)?,
            status,
            invited_by: row.invited_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile_owner(&self, profile_id: &str) -> RepoResult<Option<String>> {
        let owner = sqlx::query_scalar::<_, String>(
            r#"
            SELECT owner_id FROM profiles WHERE profile_id = $1
            "#,
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }

    async fn get_accepted_share(
        &self,
        profile_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<Role>> {
        let role = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role
            FROM profile_shares
            WHERE profile_id = $1
                AND invitee_user_id = $2
                AND status = 'ACCEPTED'
            LIMIT 1
            "#,
        )
        .bind(profile_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        role.as_deref().map(parse_role).transpose()
    }

    async fn create_profile(&self, profile: Profile) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (profile_id, owner_id, name, birth_date, relationship, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(profile.profile_id)
        .bind(profile.owner_id)
        .bind(profile.name)
        .bind(profile.birth_date)
        .bind(profile.relationship)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_profile(&self, profile_id: &str) -> RepoResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT profile_id, owner_id, name, birth_date, relationship, created_at
            FROM profiles
            WHERE profile_id = $1
            "#,
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    async fn delete_profile(&self, profile_id: &str) -> RepoResult<bool> {
        // profile_shares / vaccines reference profiles ON DELETE CASCADE
        let result = sqlx::query(
            r#"
            DELETE FROM profiles WHERE profile_id = $1
            "#,
        )
        .bind(profile_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_accessible(&self, user_id: &str) -> RepoResult<Vec<ProfileAccess>> {
        let rows = sqlx::query_as::<_, ProfileAccessRow>(
            r#"
            SELECT p.profile_id, p.owner_id, p.name, p.birth_date, p.relationship, p.created_at,
                   'Owner' AS role
            FROM profiles p
            WHERE p.owner_id = $1
            UNION ALL
            SELECT p.profile_id, p.owner_id, p.name, p.birth_date, p.relationship, p.created_at,
                   s.role AS role
            FROM profiles p
            JOIN profile_shares s ON s.profile_id = p.profile_id
            WHERE s.invitee_user_id = $1
                AND s.status = 'ACCEPTED'
                AND p.owner_id <> $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProfileAccess {
                    role: parse_role(&row.role)?,
                    profile: Profile::from(row.profile),
                })
            })
            .collect()
    }

    async fn create_share(&self, share: Share) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO profile_shares (
                profile_id, invitee_email, invitee_user_id, role, status, invited_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (profile_id, invitee_email) DO NOTHING
            "#,
        )
        .bind(share.profile_id)
        .bind(share.invitee_email)
        .bind(share.invitee_user_id)
        .bind(share.role.as_str())
        .bind(share.status.as_str())
        .bind(share.invited_by)
        .bind(share.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn accept_share(
        &self,
        profile_id: &str,
        invitee_email: &str,
        user_id: &str,
    ) -> RepoResult<Option<Share>> {
        let row = sqlx::query_as::<_, ShareRow>(
            r#"
            UPDATE profile_shares
            SET status = 'ACCEPTED',
                invitee_user_id = $3
            WHERE profile_id = $1
                AND invitee_email = $2
                AND status = 'PENDING'
            RETURNING
                profile_id, invitee_email, invitee_user_id, role, status, invited_by, created_at
            "#,
        )
        .bind(profile_id)
        .bind(invitee_email)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Share::try_from).transpose()
    }

    async fn delete_share(&self, profile_id: &str, invitee_email: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM profile_shares
            WHERE profile_id = $1 AND invitee_email = $2
            "#,
        )
        .bind(profile_id)
        .bind(invitee_email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_shares(&self, profile_id: &str) -> RepoResult<Vec<Share>> {
        let rows = sqlx::query_as::<_, ShareRow>(
            r#"
            SELECT profile_id, invitee_email, invitee_user_id, role, status, invited_by, created_at
            FROM profile_shares
            WHERE profile_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Share::try_from).collect()
    }
}
