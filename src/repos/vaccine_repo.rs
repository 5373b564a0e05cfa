/*
 * Responsibility
 * - vaccines table (records attached to a profile)
 * - Access control is done by the pipeline before these run
 */
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::Vaccine;
use crate::repos::error::RepoResult;

#[async_trait]
pub trait VaccineStore: Send + Sync {
    async fn add(&self, vaccine: Vaccine) -> RepoResult<()>;

    async fn list_for_profile(&self, profile_id: &str) -> RepoResult<Vec<Vaccine>>;

    // Scoped by profile so an id from another profile never matches.
    async fn delete(&self, profile_id: &str, vaccine_id: &str) -> RepoResult<bool>;
}

#[derive(Debug, FromRow)]
struct VaccineRow {
    vaccine_id: String,
    profile_id: String,
    name: String,
    administered_on: NaiveDate,
    dose: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<VaccineRow> for Vaccine {
    fn from(row: VaccineRow) -> Self {
        Self {
            vaccine_id: row.vaccine_id,
            profile_id: row.profile_id,
            name: row.name,
            administered_on: row.administered_on,
            dose: row.dose,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgVaccineStore {
    pool: PgPool,
}

impl PgVaccineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VaccineStore for PgVaccineStore {
    async fn add(&self, vaccine: Vaccine) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vaccines (vaccine_id, profile_id, name, administered_on, dose, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(vaccine.vaccine_id)
        .bind(vaccine.profile_id)
        .bind(vaccine.name)
        .bind(vaccine.administered_on)
        .bind(vaccine.dose)
        .bind(vaccine.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_profile(&self, profile_id: &str) -> RepoResult<Vec<Vaccine>> {
        let rows = sqlx::query_as::<_, VaccineRow>(
            r#"
            SELECT vaccine_id, profile_id, name, administered_on, dose, created_at
            FROM vaccines
            WHERE profile_id = $1
            ORDER BY administered_on DESC, created_at DESC
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Vaccine::from).collect())
    }

    async fn delete(&self, profile_id: &str, vaccine_id: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM vaccines
            WHERE profile_id = $1 AND vaccine_id = $2
            "#,
        )
        .bind(profile_id)
        .bind(vaccine_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
