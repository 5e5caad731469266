//! Storage seam for the authentication core.
//!
//! Everything the auth layer needs from persistence goes through [`AuthStore`],
//! so the lifecycle services can run against Postgres in production and the
//! in-memory store in tests.
//!
//! Two invariants live at this seam rather than in the callers:
//!
//! - `consume_code` is a single conditional delete: at most one caller can ever
//!   redeem a given code, even under concurrent requests.
//! - the `consume_code_*` composites apply the code deletion and its follow-up
//!   mutation atomically, so a crash cannot leave a code consumed with its
//!   effect unapplied (or the reverse).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{CodePurpose, DbSession, DbUser, DbVerificationCode, UserRole};

/// Fields for a new user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    /// Empty for magic-register pre-provisioned accounts.
    pub password_hash: String,
    pub role: UserRole,
    pub verified: bool,
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    // Users

    /// Create a user. Fails with `DbError::Duplicate` when the email is taken.
    async fn create_user(&self, new: NewUser) -> DbResult<DbUser>;

    async fn find_user_by_id(&self, id: Uuid) -> DbResult<Option<DbUser>>;

    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<DbUser>>;

    // Sessions

    async fn create_session(
        &self,
        user_id: Uuid,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> DbResult<DbSession>;

    async fn find_session(&self, id: Uuid) -> DbResult<Option<DbSession>>;

    /// Push the session expiry forward (sliding renewal).
    async fn extend_session(&self, id: Uuid, expires_at: DateTime<Utc>) -> DbResult<()>;

    /// Delete one session, scoped to its owner. A no-op when already gone.
    async fn delete_session(&self, id: Uuid, user_id: Uuid) -> DbResult<()>;

    /// Delete every session a user owns. Returns the number removed.
    async fn delete_all_sessions(&self, user_id: Uuid) -> DbResult<u64>;

    // Verification codes

    async fn create_code(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        expires_at: DateTime<Utc>,
    ) -> DbResult<DbVerificationCode>;

    /// Count codes of a purpose issued to a user since `since`.
    async fn count_codes_since(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        since: DateTime<Utc>,
    ) -> DbResult<u64>;

    /// Redeem a code: delete it iff it exists with the given purpose and is
    /// unexpired, returning the deleted row. Atomic, single winner.
    async fn consume_code(
        &self,
        id: Uuid,
        purpose: CodePurpose,
    ) -> DbResult<Option<DbVerificationCode>>;

    /// Redeem a code and mark its owner verified, in one transaction.
    /// Returns the updated user, or `None` when the code was invalid.
    async fn consume_code_verifying_user(
        &self,
        id: Uuid,
        purpose: CodePurpose,
    ) -> DbResult<Option<DbUser>>;

    /// Redeem a password-reset code, replace the owner's password hash, and
    /// delete all of the owner's sessions, in one transaction.
    /// Returns the updated user, or `None` when the code was invalid.
    async fn consume_code_resetting_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> DbResult<Option<DbUser>>;
}
