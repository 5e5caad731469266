//! Core authentication types
//!
//! Shared types used across the authentication layer: token claims,
//! request/response shapes, and the authenticated user context.

use chrono::{DateTime, Utc};
use hireboard_db::{DbUser, UserRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for short-lived access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: user id
    pub sub: String,
    /// Session id the token is bound to
    pub sid: String,
    /// User role, embedded for cheap authorization checks
    pub role: UserRole,
    /// Audience
    pub aud: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expires at (unix timestamp)
    pub exp: i64,
}

/// JWT claims for long-lived refresh tokens
///
/// Deliberately carries only the session id; user identity is resolved
/// through the session row on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Session id the token is bound to
    pub sid: String,
    /// Audience
    pub aud: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expires at (unix timestamp)
    pub exp: i64,
}

/// Access + refresh token pair issued on login/registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token
    pub access_token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Token type for the Authorization header
    pub token_type: String,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// Outcome of a refresh: always a new access token, and a new refresh
/// token only when the session was renewed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// Newly minted access token
    pub access_token: String,
    /// Replacement refresh token, present only on session renewal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_refresh_token: Option<String>,
}

/// Authenticated user context attached to requests by the middleware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// User id
    pub user_id: Uuid,
    /// Session id from the access token
    pub session_id: Uuid,
    /// Role as of token issue time
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Check if this user has admin role
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User representation safe to return to clients (no password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for SanitizedUser {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    /// Client user agent, recorded on the session
    pub user_agent: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Client user agent, recorded on the session
    pub user_agent: Option<String>,
}

/// Password reset request (code comes from the emailed link)
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub verification_code: String,
}

/// Response for flows that establish a session
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: SanitizedUser,
    pub access_token: String,
    pub refresh_token: String,
}
