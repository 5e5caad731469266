//! Session lifecycle
//!
//! Sessions are server-side rows with an absolute expiry. Tokens are bound
//! to a session id, so deleting the row invalidates every outstanding token
//! for it the moment the access token expires.
//!
//! Refresh applies a sliding window: when the session's remaining lifetime
//! drops below the renewal threshold, the expiry is pushed out and a
//! replacement refresh token is minted. Otherwise the existing refresh
//! token keeps serving.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{AuthError, AuthResult};
use crate::token::TokenService;
use crate::types::{RefreshOutcome, TokenPair};
use hireboard_db::{AuthStore, DbSession, UserRole};

/// Session management service
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn AuthStore>,
    tokens: TokenService,
    config: SessionConfig,
}

impl SessionService {
    /// Create a new session service
    pub fn new(store: Arc<dyn AuthStore>, tokens: TokenService, config: SessionConfig) -> Self {
        Self {
            store,
            tokens,
            config,
        }
    }

    /// Open a session for a user
    pub async fn open_session(
        &self,
        user_id: Uuid,
        user_agent: Option<&str>,
    ) -> AuthResult<DbSession> {
        let expires_at = Utc::now()
            + Duration::from_std(self.config.lifetime)
                .map_err(|e| AuthError::Internal(e.to_string()))?;

        let session = self
            .store
            .create_session(user_id, user_agent, expires_at)
            .await?;
        Ok(session)
    }

    /// Issue an access/refresh pair bound to a session
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        role: UserRole,
        session_id: Uuid,
    ) -> AuthResult<TokenPair> {
        let access = self.tokens.sign_access(user_id, session_id, role)?;
        let refresh = self.tokens.sign_refresh(session_id)?;
        Ok(TokenPair::new(access, refresh))
    }

    /// Exchange a refresh token for a new access token
    ///
    /// The session must still be live; a dead session fails regardless of
    /// the refresh token's own validity. When the session's remaining
    /// lifetime is at or below the renewal threshold, the session expiry is
    /// extended and a replacement refresh token is returned alongside.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshOutcome> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let session_id =
            Uuid::parse_str(&claims.sid).map_err(|_| AuthError::InvalidRefreshToken)?;

        let now = Utc::now();
        let session = self
            .store
            .find_session(session_id)
            .await?
            .filter(|s| s.is_live(now))
            .ok_or(AuthError::SessionExpired)?;

        let user = self
            .store
            .find_user_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let threshold = Duration::from_std(self.config.renewal_threshold)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let new_refresh_token = if session.expires_at - now <= threshold {
            let lifetime = Duration::from_std(self.config.lifetime)
                .map_err(|e| AuthError::Internal(e.to_string()))?;
            self.store
                .extend_session(session.id, now + lifetime)
                .await?;
            debug!(session_id = %session.id, "session renewed");
            Some(self.tokens.sign_refresh(session.id)?)
        } else {
            None
        };

        let access_token = self.tokens.sign_access(user.id, session.id, user.role)?;
        Ok(RefreshOutcome {
            access_token,
            new_refresh_token,
        })
    }

    /// Tear down the session named by an access token
    ///
    /// Best-effort: an invalid or expired token is not an error, since the
    /// caller is clearing cookies either way.
    pub async fn logout(&self, access_token: &str) -> AuthResult<()> {
        let claims = match self.tokens.verify_access(access_token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "logout with unusable access token");
                return Ok(());
            }
        };

        let (Ok(user_id), Ok(session_id)) =
            (Uuid::parse_str(&claims.sub), Uuid::parse_str(&claims.sid))
        else {
            return Ok(());
        };

        self.store.delete_session(session_id, user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use hireboard_db::{MemoryStore, NewUser};

    fn token_service() -> TokenService {
        TokenService::new(JwtConfig {
            access_secret: "access-secret-key-for-tests-min-32-bytes".to_string(),
            refresh_secret: "refresh-secret-key-for-tests-min-32-byte".to_string(),
            ..JwtConfig::default()
        })
    }

    fn service(store: Arc<dyn AuthStore>) -> SessionService {
        SessionService::new(store, token_service(), SessionConfig::default())
    }

    async fn seed_user(store: &MemoryStore) -> hireboard_db::DbUser {
        store
            .create_user(NewUser {
                email: "user@example.com".to_string(),
                full_name: "User".to_string(),
                password_hash: "$argon2id$x".to_string(),
                role: UserRole::Candidate,
                verified: true,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_without_renewal() {
        let store = MemoryStore::new();
        let user = seed_user(&store).await;
        let sessions = service(Arc::new(store.clone()));

        // Fresh 30-day session: well above the 24h threshold.
        let session = sessions.open_session(user.id, None).await.unwrap();
        let pair = sessions
            .issue_pair(user.id, user.role, session.id)
            .unwrap();

        let outcome = sessions.refresh(&pair.refresh_token).await.unwrap();
        assert!(!outcome.access_token.is_empty());
        assert!(outcome.new_refresh_token.is_none());

        // No renewal: the expiry is untouched.
        let unchanged = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(unchanged.expires_at, session.expires_at);
    }

    #[tokio::test]
    async fn test_refresh_renews_near_expiry() {
        let store = MemoryStore::new();
        let user = seed_user(&store).await;
        let sessions = service(Arc::new(store.clone()));

        // One hour left, under the 24h threshold.
        let session = store
            .create_session(user.id, None, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        let refresh_token = token_service().sign_refresh(session.id).unwrap();

        let outcome = sessions.refresh(&refresh_token).await.unwrap();
        assert!(outcome.new_refresh_token.is_some());

        let extended = store.find_session(session.id).await.unwrap().unwrap();
        assert!(extended.expires_at > Utc::now() + Duration::days(29));
    }

    #[tokio::test]
    async fn test_refresh_fails_for_expired_session() {
        let store = MemoryStore::new();
        let user = seed_user(&store).await;
        let sessions = service(Arc::new(store.clone()));

        let session = store
            .create_session(user.id, None, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        let refresh_token = token_service().sign_refresh(session.id).unwrap();

        let result = sessions.refresh(&refresh_token).await;
        assert!(matches!(result, Err(AuthError::SessionExpired)));
    }

    #[tokio::test]
    async fn test_refresh_fails_for_deleted_session() {
        let store = MemoryStore::new();
        let user = seed_user(&store).await;
        let sessions = service(Arc::new(store.clone()));

        let session = sessions.open_session(user.id, None).await.unwrap();
        let pair = sessions
            .issue_pair(user.id, user.role, session.id)
            .unwrap();
        store.delete_session(session.id, user.id).await.unwrap();

        let result = sessions.refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::SessionExpired)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_garbage_token() {
        let store = MemoryStore::new();
        let sessions = service(Arc::new(store));

        let result = sessions.refresh("garbage").await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn test_logout_deletes_session() {
        let store = MemoryStore::new();
        let user = seed_user(&store).await;
        let sessions = service(Arc::new(store.clone()));

        let session = sessions.open_session(user.id, None).await.unwrap();
        let pair = sessions
            .issue_pair(user.id, user.role, session.id)
            .unwrap();

        sessions.logout(&pair.access_token).await.unwrap();
        assert!(store.find_session(session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = MemoryStore::new();
        let user = seed_user(&store).await;
        let sessions = service(Arc::new(store.clone()));

        let first = sessions.open_session(user.id, Some("laptop")).await.unwrap();
        let second = sessions.open_session(user.id, Some("phone")).await.unwrap();
        assert_ne!(first.id, second.id);

        let first_pair = sessions.issue_pair(user.id, user.role, first.id).unwrap();
        let second_pair = sessions.issue_pair(user.id, user.role, second.id).unwrap();

        // Ending one session leaves the other refreshable.
        sessions.logout(&first_pair.access_token).await.unwrap();
        assert!(sessions.refresh(&first_pair.refresh_token).await.is_err());
        assert!(sessions.refresh(&second_pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_tolerates_bad_token() {
        let store = MemoryStore::new();
        let sessions = service(Arc::new(store));
        assert!(sessions.logout("garbage").await.is_ok());
    }
}
