/**
 * Responsibility
 * - Meaning a store adapter passes up to the gates and handlers
 * - Callers map every variant to INTERNAL_ERROR; detail stays in logs
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("invalid page token")]
    InvalidPageToken,
}

pub type RepoResult<T> = Result<T, RepoError>;
