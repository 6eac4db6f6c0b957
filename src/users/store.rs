use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::model::{NewUserRow, UserRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::UniqueViolation,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Unavailable(e.to_string()),
            _ => Self::Database(e),
        }
    }
}

/// Row-level access to the `users` table.
///
/// Every read ignores soft-deleted rows; only `truncate` touches them.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, row: NewUserRow) -> Result<UserRecord, StoreError>;

    /// Public profile projection: `id`, `username` and `email` only.
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// Full record including the password hash. A username match wins over an
    /// email match when both exist.
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Returns `false` when no live row had that id.
    async fn soft_delete(&self, id: i64) -> Result<bool, StoreError>;

    async fn truncate(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, row: NewUserRow) -> Result<UserRecord, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (username, email, biography, password)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, biography, password,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(&row.username)
        .bind(&row.email)
        .bind(&row.biography)
        .bind(&row.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, biography, password,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE (username = $1 OR email = $2) AND deleted_at IS NULL
            ORDER BY (username = $1) DESC, id
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = now(), updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn truncate(&self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE TABLE users CASCADE")
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
