//! Authentication error types
//!
//! Errors are designed to be:
//! - Informative for logging/debugging
//! - Safe for external exposure (no sensitive data leakage)
//! - Convertible to HTTP status codes

use hireboard_db::DbError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    // =========================================================================
    // Token Errors
    // =========================================================================
    /// No usable credential on the request
    #[error("Not authorized")]
    NotAuthorized,

    /// Access token has expired
    #[error("Token expired")]
    TokenExpired,

    /// Token is malformed, has a bad signature, or the wrong audience
    #[error("Invalid token")]
    InvalidToken,

    /// Refresh token failed verification
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// Session is gone or past its expiry
    #[error("Session expired")]
    SessionExpired,

    // =========================================================================
    // Credential Errors
    // =========================================================================
    /// No account for the given email or id
    #[error("User not found")]
    UserNotFound,

    /// No account for the given email (magic-link login)
    #[error("Email not found")]
    EmailNotFound,

    /// Password did not match the stored hash
    #[error("Invalid password")]
    InvalidPassword,

    /// Password and confirmation did not match
    #[error("Passwords do not match")]
    PasswordMismatch,

    // =========================================================================
    // Account Errors
    // =========================================================================
    /// Email is taken (registration)
    #[error("Email already in use")]
    EmailInUse,

    /// Email is taken (magic-link registration)
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    // =========================================================================
    // One-Time Code Errors
    // =========================================================================
    /// Verification or reset code is unknown, expired, or already used
    #[error("Invalid or expired verification code")]
    InvalidCode,

    /// Magic-link code is unknown, expired, or already used
    #[error("Link expired or invalid")]
    InvalidMagicLink,

    // =========================================================================
    // Rate Limiting Errors
    // =========================================================================
    /// Too many reset requests in the window
    #[error("Too many requests, try again later")]
    TooManyRequests,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Outbound email delivery failed
    #[error("Failed to send email: {0}")]
    EmailDispatch(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error (should not be exposed to clients)
    #[error("Internal error")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::PasswordMismatch => 400,

            // 401 Unauthorized
            Self::NotAuthorized
            | Self::TokenExpired
            | Self::InvalidToken
            | Self::InvalidRefreshToken
            | Self::SessionExpired
            | Self::InvalidMagicLink => 401,

            // 404 Not Found
            Self::UserNotFound
            | Self::EmailNotFound
            | Self::InvalidPassword
            | Self::InvalidCode => 404,

            // 409 Conflict
            Self::EmailInUse | Self::EmailAlreadyRegistered => 409,

            // 429 Too Many Requests
            Self::TooManyRequests => 429,

            // 500 Internal Server Error
            Self::EmailDispatch(_) | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Get an error code for the client (safe to expose)
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::EmailNotFound => "EMAIL_NOT_FOUND",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::EmailInUse => "EMAIL_IN_USE",
            Self::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            Self::InvalidCode => "INVALID_CODE",
            Self::InvalidMagicLink => "INVALID_MAGIC_LINK",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::EmailDispatch(_) => "EMAIL_DISPATCH_FAILED",
            Self::Database(_) => "INTERNAL_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Get safe message for client (doesn't leak internal details)
    pub fn client_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            Self::EmailDispatch(_) => "Failed to send email".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error response for API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (machine-readable)
    pub code: String,
    /// Error message (human-readable)
    pub message: String,
}

impl From<&AuthError> for ErrorResponse {
    fn from(error: &AuthError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.client_message(),
        }
    }
}

// Implement conversion from common error types
impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::InvalidToken,
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Internal(format!("password hash: {}", err))
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        Self::Internal(format!("argon2 parameters: {}", err))
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(_) => Self::EmailInUse,
            // A store-level NotFound from a composite means a code pointed at
            // a missing user, which is a consistency bug, not client input.
            DbError::NotFound(msg) => Self::Internal(msg),
            other => Self::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::NotAuthorized.status_code(), 401);
        assert_eq!(AuthError::InvalidPassword.status_code(), 404);
        assert_eq!(AuthError::EmailInUse.status_code(), 409);
        assert_eq!(AuthError::TooManyRequests.status_code(), 429);
        assert_eq!(AuthError::Database("test".to_string()).status_code(), 500);
    }

    #[test]
    fn test_client_messages_match_api_contract() {
        assert_eq!(AuthError::NotAuthorized.client_message(), "Not authorized");
        assert_eq!(AuthError::TokenExpired.client_message(), "Token expired");
        assert_eq!(AuthError::SessionExpired.client_message(), "Session expired");
        assert_eq!(
            AuthError::InvalidRefreshToken.client_message(),
            "Invalid refresh token"
        );
        assert_eq!(
            AuthError::InvalidMagicLink.client_message(),
            "Link expired or invalid"
        );
        assert_eq!(
            AuthError::InvalidCode.client_message(),
            "Invalid or expired verification code"
        );
    }

    #[test]
    fn test_client_message_hides_internal_details() {
        let err = AuthError::Database("connection string with password".to_string());
        assert!(!err.client_message().contains("password"));
        assert_eq!(err.client_message(), "An internal error occurred");
    }

    #[test]
    fn test_jwt_error_mapping() {
        use jsonwebtoken::errors::{Error, ErrorKind};

        let expired: AuthError = Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(expired, AuthError::TokenExpired));

        let bad_sig: AuthError = Error::from(ErrorKind::InvalidSignature).into();
        assert!(matches!(bad_sig, AuthError::InvalidToken));
    }

    #[test]
    fn test_db_error_mapping() {
        let dup: AuthError = DbError::Duplicate("email".to_string()).into();
        assert!(matches!(dup, AuthError::EmailInUse));

        let missing: AuthError = DbError::NotFound("user".to_string()).into();
        assert!(matches!(missing, AuthError::Internal(_)));
    }
}
