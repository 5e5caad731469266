//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    #[default]
    Candidate,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Candidate => "candidate",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for UserRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Self::Admin),
            "candidate" => Ok(Self::Candidate),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// What a one-time verification code is allowed to be redeemed for.
/// A code is only valid for the purpose it was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    EmailVerification,
    PasswordReset,
    MagicLogin,
    MagicRegister,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
            Self::MagicLogin => "magic_login",
            Self::MagicRegister => "magic_register",
        }
    }
}

impl std::fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CodePurpose {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "email_verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            "magic_login" => Ok(Self::MagicLogin),
            "magic_register" => Ok(Self::MagicRegister),
            other => Err(format!("unknown code purpose: {other}")),
        }
    }
}

/// A registered user. `password_hash` is empty for accounts pre-provisioned
/// through the magic-register flow and filled in on completion.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An active login. Valid while `expires_at` is in the future.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DbSession {
    /// A session is live iff its expiry is still in the future.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// A single-use verification code. The row id is the opaque value embedded in
/// emailed URLs; existence of the row means the code is unconsumed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbVerificationCode {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub purpose: CodePurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Admin, UserRole::Candidate] {
            assert_eq!(UserRole::try_from(role.as_str().to_string()), Ok(role));
        }
        assert!(UserRole::try_from("superuser".to_string()).is_err());
    }

    #[test]
    fn test_purpose_round_trip() {
        for purpose in [
            CodePurpose::EmailVerification,
            CodePurpose::PasswordReset,
            CodePurpose::MagicLogin,
            CodePurpose::MagicRegister,
        ] {
            assert_eq!(
                CodePurpose::try_from(purpose.as_str().to_string()),
                Ok(purpose)
            );
        }
    }

    #[test]
    fn test_session_liveness() {
        let now = Utc::now();
        let session = DbSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_agent: None,
            expires_at: now + chrono::Duration::hours(1),
            created_at: now,
        };
        assert!(session.is_live(now));
        assert!(!session.is_live(now + chrono::Duration::hours(2)));
    }
}
