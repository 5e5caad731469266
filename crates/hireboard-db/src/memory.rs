//! In-memory implementation of [`AuthStore`]
//!
//! Backs the auth layer's tests. Each operation takes the write lock once, so
//! the composite operations are as atomic here as the Postgres transactions
//! they stand in for.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{CodePurpose, DbSession, DbUser, DbVerificationCode};
use crate::store::{AuthStore, NewUser};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, DbUser>,
    sessions: HashMap<Uuid, DbSession>,
    codes: HashMap<Uuid, DbVerificationCode>,
}

/// In-memory store for tests and local development
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn verify_user(inner: &mut Inner, user_id: Uuid) -> Option<DbUser> {
    let user = inner.users.get_mut(&user_id)?;
    user.verified = true;
    user.updated_at = Utc::now();
    Some(user.clone())
}

fn take_valid_code(
    inner: &mut Inner,
    id: Uuid,
    purpose: CodePurpose,
) -> Option<DbVerificationCode> {
    let now = Utc::now();
    let matches = inner
        .codes
        .get(&id)
        .is_some_and(|c| c.purpose == purpose && c.expires_at > now);
    if matches {
        inner.codes.remove(&id)
    } else {
        None
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> DbResult<DbUser> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.email == new.email) {
            return Err(DbError::Duplicate(format!(
                "Email {} already exists",
                new.email
            )));
        }

        let now = Utc::now();
        let user = DbUser {
            id: Uuid::new_v4(),
            email: new.email,
            full_name: new.full_name,
            password_hash: new.password_hash,
            role: new.role,
            verified: new.verified,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> DbResult<Option<DbUser>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<DbUser>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> DbResult<DbSession> {
        let mut inner = self.inner.write().await;
        let session = DbSession {
            id: Uuid::new_v4(),
            user_id,
            user_agent: user_agent.map(String::from),
            expires_at,
            created_at: Utc::now(),
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> DbResult<Option<DbSession>> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn extend_session(&self, id: Uuid, expires_at: DateTime<Utc>) -> DbResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.get_mut(&id) {
            session.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete_session(&self, id: Uuid, user_id: Uuid) -> DbResult<()> {
        let mut inner = self.inner.write().await;
        let owned = inner
            .sessions
            .get(&id)
            .is_some_and(|s| s.user_id == user_id);
        if owned {
            inner.sessions.remove(&id);
        }
        Ok(())
    }

    async fn delete_all_sessions(&self, user_id: Uuid) -> DbResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn create_code(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        expires_at: DateTime<Utc>,
    ) -> DbResult<DbVerificationCode> {
        let mut inner = self.inner.write().await;
        let code = DbVerificationCode {
            id: Uuid::new_v4(),
            user_id,
            purpose,
            expires_at,
            created_at: Utc::now(),
        };
        inner.codes.insert(code.id, code.clone());
        Ok(code)
    }

    async fn count_codes_since(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        since: DateTime<Utc>,
    ) -> DbResult<u64> {
        Ok(self
            .inner
            .read()
            .await
            .codes
            .values()
            .filter(|c| c.user_id == user_id && c.purpose == purpose && c.created_at > since)
            .count() as u64)
    }

    async fn consume_code(
        &self,
        id: Uuid,
        purpose: CodePurpose,
    ) -> DbResult<Option<DbVerificationCode>> {
        let mut inner = self.inner.write().await;
        Ok(take_valid_code(&mut inner, id, purpose))
    }

    async fn consume_code_verifying_user(
        &self,
        id: Uuid,
        purpose: CodePurpose,
    ) -> DbResult<Option<DbUser>> {
        let mut inner = self.inner.write().await;
        let Some(code) = take_valid_code(&mut inner, id, purpose) else {
            return Ok(None);
        };
        let user = verify_user(&mut inner, code.user_id).ok_or_else(|| {
            DbError::NotFound(format!("user {} for verification code", code.user_id))
        })?;
        Ok(Some(user))
    }

    async fn consume_code_resetting_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> DbResult<Option<DbUser>> {
        let mut inner = self.inner.write().await;
        let Some(code) = take_valid_code(&mut inner, id, CodePurpose::PasswordReset) else {
            return Ok(None);
        };
        let user = {
            let user = inner
                .users
                .get_mut(&code.user_id)
                .ok_or_else(|| {
                    DbError::NotFound(format!("user {} for password reset", code.user_id))
                })?;
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
            user.clone()
        };
        inner.sessions.retain(|_, s| s.user_id != user.id);
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: "$argon2id$test".to_string(),
            role: UserRole::Candidate,
            verified: false,
        }
    }

    #[tokio::test]
    async fn test_email_uniqueness() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();

        let result = store.create_user(new_user("a@example.com")).await;
        assert!(matches!(result, Err(DbError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_consume_code_is_single_use() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("b@example.com")).await.unwrap();
        let code = store
            .create_code(
                user.id,
                CodePurpose::EmailVerification,
                Utc::now() + Duration::hours(1),
            )
            .await
            .unwrap();

        let first = store
            .consume_code(code.id, CodePurpose::EmailVerification)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .consume_code(code.id, CodePurpose::EmailVerification)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_consume_code_rejects_wrong_purpose_and_expiry() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("c@example.com")).await.unwrap();

        let expired = store
            .create_code(
                user.id,
                CodePurpose::MagicLogin,
                Utc::now() - Duration::minutes(1),
            )
            .await
            .unwrap();
        assert!(store
            .consume_code(expired.id, CodePurpose::MagicLogin)
            .await
            .unwrap()
            .is_none());

        let live = store
            .create_code(
                user.id,
                CodePurpose::MagicLogin,
                Utc::now() + Duration::minutes(5),
            )
            .await
            .unwrap();
        assert!(store
            .consume_code(live.id, CodePurpose::PasswordReset)
            .await
            .unwrap()
            .is_none());
        // Wrong-purpose attempt must not consume the code.
        assert!(store
            .consume_code(live.id, CodePurpose::MagicLogin)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_reset_password_revokes_all_sessions() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("d@example.com")).await.unwrap();
        let far = Utc::now() + Duration::days(30);
        store.create_session(user.id, None, far).await.unwrap();
        store.create_session(user.id, None, far).await.unwrap();

        let code = store
            .create_code(
                user.id,
                CodePurpose::PasswordReset,
                Utc::now() + Duration::hours(1),
            )
            .await
            .unwrap();

        let updated = store
            .consume_code_resetting_password(code.id, "$argon2id$new")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.password_hash, "$argon2id$new");
        assert_eq!(store.delete_all_sessions(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_session_scoped_to_owner() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("e@example.com")).await.unwrap();
        let other = store.create_user(new_user("f@example.com")).await.unwrap();
        let session = store
            .create_session(user.id, Some("test-agent"), Utc::now() + Duration::days(1))
            .await
            .unwrap();

        // Wrong owner: no-op.
        store.delete_session(session.id, other.id).await.unwrap();
        assert!(store.find_session(session.id).await.unwrap().is_some());

        store.delete_session(session.id, user.id).await.unwrap();
        assert!(store.find_session(session.id).await.unwrap().is_none());
    }
}
