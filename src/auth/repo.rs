use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email already registered")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records, keyed by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a pending user. Fails with [`RepoError::Duplicate`] when the email exists.
    async fn create(&self, user: NewUser<'_>) -> Result<User, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    /// Idempotent.
    async fn mark_active(&self, email: &str) -> Result<(), RepoError>;
    async fn ping(&self) -> Result<(), RepoError>;
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
    async fn create(&self, user: NewUser<'_>) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, activation_code, code_expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING email, password_hash, activation_code, code_expires_at, is_active
            "#,
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.activation_code)
        .bind(user.code_expires_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => RepoError::Duplicate,
            _ => RepoError::Database(e),
        })?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT email, password_hash, activation_code, code_expires_at, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn mark_active(&self, email: &str) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET is_active = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
