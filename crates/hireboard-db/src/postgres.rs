//! PostgreSQL implementation of [`AuthStore`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{CodePurpose, DbSession, DbUser, DbVerificationCode};
use crate::store::{AuthStore, NewUser};

const USER_COLUMNS: &str =
    "id, email, full_name, password_hash, role, verified, created_at, updated_at";

/// Postgres-backed store for users, sessions, and verification codes
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn create_user(&self, new: NewUser) -> DbResult<DbUser> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            r#"
            INSERT INTO users (email, full_name, password_hash, role, verified)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(new.verified)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("users_email_key") {
                    return DbError::Duplicate(format!("Email {} already exists", new.email));
                }
            }
            DbError::Query(e)
        })?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> DbResult<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> DbResult<DbSession> {
        let session = sqlx::query_as::<_, DbSession>(
            r#"
            INSERT INTO sessions (user_id, user_agent, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, user_agent, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> DbResult<Option<DbSession>> {
        let session = sqlx::query_as::<_, DbSession>(
            "SELECT id, user_id, user_agent, expires_at, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn extend_session(&self, id: Uuid, expires_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET expires_at = $2 WHERE id = $1")
            .bind(id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_session(&self, id: Uuid, user_id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_all_sessions(&self, user_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn create_code(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        expires_at: DateTime<Utc>,
    ) -> DbResult<DbVerificationCode> {
        let code = sqlx::query_as::<_, DbVerificationCode>(
            r#"
            INSERT INTO verification_codes (user_id, purpose, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, purpose, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(code)
    }

    async fn count_codes_since(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        since: DateTime<Utc>,
    ) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM verification_codes
            WHERE user_id = $1 AND purpose = $2 AND created_at > $3
            "#,
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn consume_code(
        &self,
        id: Uuid,
        purpose: CodePurpose,
    ) -> DbResult<Option<DbVerificationCode>> {
        // Single conditional delete so concurrent redemptions have one winner.
        let code = sqlx::query_as::<_, DbVerificationCode>(
            r#"
            DELETE FROM verification_codes
            WHERE id = $1 AND purpose = $2 AND expires_at > NOW()
            RETURNING id, user_id, purpose, expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    async fn consume_code_verifying_user(
        &self,
        id: Uuid,
        purpose: CodePurpose,
    ) -> DbResult<Option<DbUser>> {
        let mut tx = self.pool.begin().await?;

        let code = sqlx::query_as::<_, DbVerificationCode>(
            r#"
            DELETE FROM verification_codes
            WHERE id = $1 AND purpose = $2 AND expires_at > NOW()
            RETURNING id, user_id, purpose, expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(purpose.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(code) = code else {
            tx.rollback().await?;
            return Ok(None);
        };

        let user = sqlx::query_as::<_, DbUser>(&format!(
            r#"
            UPDATE users SET verified = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(code.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        // A valid code pointing at a missing user is a consistency bug.
        let user = user.ok_or_else(|| {
            DbError::NotFound(format!("user {} for verification code", code.user_id))
        })?;

        tx.commit().await?;
        Ok(Some(user))
    }

    async fn consume_code_resetting_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> DbResult<Option<DbUser>> {
        let mut tx = self.pool.begin().await?;

        let code = sqlx::query_as::<_, DbVerificationCode>(
            r#"
            DELETE FROM verification_codes
            WHERE id = $1 AND purpose = $2 AND expires_at > NOW()
            RETURNING id, user_id, purpose, expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(CodePurpose::PasswordReset.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(code) = code else {
            tx.rollback().await?;
            return Ok(None);
        };

        let user = sqlx::query_as::<_, DbUser>(&format!(
            r#"
            UPDATE users SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(code.user_id)
        .bind(password_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("user {} for password reset", code.user_id)))?;

        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(user))
    }
}
