//! JWT Token Service
//!
//! Stateless HS256 codec for the two token kinds:
//! - Access tokens (short-lived) carry user id, session id, and role
//! - Refresh tokens (long-lived) carry only the session id
//!
//! Each kind is signed with its own secret, so a refresh token can never
//! pass access-token verification and vice versa.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::types::{AccessClaims, RefreshClaims};
use hireboard_db::UserRole;

/// JWT service for signing and verifying tokens
#[derive(Clone)]
pub struct TokenService {
    config: JwtConfig,
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
}

impl TokenService {
    /// Create a new token service
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding_key = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding_key = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding_key = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding_key = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        Self {
            config,
            access_encoding_key,
            access_decoding_key,
            refresh_encoding_key,
            refresh_decoding_key,
        }
    }

    /// Sign an access token bound to a user and session
    pub fn sign_access(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        role: UserRole,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now
            + Duration::from_std(self.config.access_token_lifetime)
                .map_err(|e| AuthError::Internal(e.to_string()))?;

        let claims = AccessClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            role,
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.access_encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to encode access token: {}", e)))
    }

    /// Sign a refresh token bound to a session
    pub fn sign_refresh(&self, session_id: Uuid) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now
            + Duration::from_std(self.config.refresh_token_lifetime)
                .map_err(|e| AuthError::Internal(e.to_string()))?;

        let claims = RefreshClaims {
            sid: session_id.to_string(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to encode refresh token: {}", e)))
    }

    /// Verify an access token and return its claims
    pub fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.access_decoding_key, &self.validation())?;
        Ok(data.claims)
    }

    /// Verify a refresh token and return its claims
    ///
    /// Any failure (bad signature, expiry, audience) collapses to
    /// [`AuthError::InvalidRefreshToken`].
    pub fn verify_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding_key, &self.validation())
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret-key-for-tests-min-32-bytes".to_string(),
            refresh_secret: "refresh-secret-key-for-tests-min-32-byte".to_string(),
            access_token_lifetime: std::time::Duration::from_secs(900),
            refresh_token_lifetime: std::time::Duration::from_secs(30 * 24 * 60 * 60),
            audience: "user".to_string(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = TokenService::new(test_config());
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        let token = service
            .sign_access(user_id, session_id, UserRole::Candidate)
            .unwrap();
        let claims = service.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.sid, session_id.to_string());
        assert_eq!(claims.role, UserRole::Candidate);
        assert_eq!(claims.aud, "user");
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let service = TokenService::new(test_config());
        let session_id = Uuid::new_v4();

        let token = service.sign_refresh(session_id).unwrap();
        let claims = service.verify_refresh(&token).unwrap();
        assert_eq!(claims.sid, session_id.to_string());
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let service = TokenService::new(test_config());
        let token = service.sign_refresh(Uuid::new_v4()).unwrap();

        // Different signing secret, so verification fails outright.
        assert!(service.verify_access(&token).is_err());
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let service = TokenService::new(test_config());
        let token = service
            .sign_access(Uuid::new_v4(), Uuid::new_v4(), UserRole::Candidate)
            .unwrap();

        let result = service.verify_refresh(&token);
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[test]
    fn test_expired_access_token() {
        let mut config = test_config();
        config.access_token_lifetime = std::time::Duration::from_secs(0);
        let service = TokenService::new(config);

        let token = service
            .sign_access(Uuid::new_v4(), Uuid::new_v4(), UserRole::Candidate)
            .unwrap();

        // Default leeway would mask a zero-lifetime expiry; strip it.
        let mut validation = Validation::default();
        validation.set_audience(&["user"]);
        validation.leeway = 0;
        let result = decode::<AccessClaims>(&token, &service.access_decoding_key, &validation)
            .map_err(AuthError::from);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let service = TokenService::new(test_config());
        let mut other = test_config();
        other.audience = "service".to_string();
        let other_service = TokenService::new(other);

        let token = other_service
            .sign_access(Uuid::new_v4(), Uuid::new_v4(), UserRole::Candidate)
            .unwrap();
        let result = service.verify_access(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = TokenService::new(test_config());
        let token = service
            .sign_access(Uuid::new_v4(), Uuid::new_v4(), UserRole::Candidate)
            .unwrap();

        // Flip one character in the payload segment.
        let mut bytes = token.into_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(service.verify_access(&tampered).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = TokenService::new(test_config());
        assert!(matches!(
            service.verify_access("not-a-token"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service.verify_refresh("not-a-token"),
            Err(AuthError::InvalidRefreshToken)
        ));
    }
}
