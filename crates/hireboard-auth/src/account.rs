//! Account flows: registration, login, email verification, password reset
//!
//! Every flow that emails a link mints a single-use code row whose id is the
//! opaque value in the URL. Redemption is a conditional delete in the store,
//! so a code can only ever be spent once, for the purpose it was issued with,
//! before its expiry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{CodeConfig, LinkConfig};
use crate::error::{AuthError, AuthResult};
use crate::mailer::Mailer;
use crate::password::PasswordService;
use crate::session::SessionService;
use crate::types::{
    AuthResponse, LoginRequest, RegisterRequest, ResetPasswordRequest, SanitizedUser,
};
use hireboard_db::{AuthStore, CodePurpose, NewUser, UserRole};

/// Account management service
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AuthStore>,
    hasher: PasswordService,
    sessions: SessionService,
    mailer: Arc<dyn Mailer>,
    codes: CodeConfig,
    links: LinkConfig,
}

impl AccountService {
    /// Create a new account service
    pub fn new(
        store: Arc<dyn AuthStore>,
        hasher: PasswordService,
        sessions: SessionService,
        mailer: Arc<dyn Mailer>,
        codes: CodeConfig,
        links: LinkConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            sessions,
            mailer,
            codes,
            links,
        }
    }

    /// Register a new account and open its first session
    ///
    /// Sends an email verification link; the account works before
    /// verification, `verified` just stays false.
    pub async fn register(&self, req: RegisterRequest) -> AuthResult<AuthResponse> {
        if req.password != req.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        if self.store.find_user_by_email(&req.email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user = self
            .store
            .create_user(NewUser {
                email: req.email,
                full_name: req.full_name,
                password_hash,
                role: UserRole::Candidate,
                verified: false,
            })
            .await?;

        let ttl = Duration::from_std(self.codes.email_verification_ttl)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let code = self
            .store
            .create_code(user.id, CodePurpose::EmailVerification, Utc::now() + ttl)
            .await?;

        let url = self.links.verify_email_url(&code.id.to_string());
        self.mailer
            .send_verification(&user.email, &url)
            .await
            .map_err(|e| AuthError::EmailDispatch(e.to_string()))?;

        info!(user_id = %user.id, "account registered");

        let session = self
            .sessions
            .open_session(user.id, req.user_agent.as_deref())
            .await?;
        let pair = self.sessions.issue_pair(user.id, user.role, session.id)?;

        Ok(AuthResponse {
            user: user.into(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Log in with email and password, opening a new session
    pub async fn login(&self, req: LoginRequest) -> AuthResult<AuthResponse> {
        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.hasher.verify(&req.password, &user.password_hash)? {
            return Err(AuthError::InvalidPassword);
        }

        let session = self
            .sessions
            .open_session(user.id, req.user_agent.as_deref())
            .await?;
        let pair = self.sessions.issue_pair(user.id, user.role, session.id)?;

        info!(user_id = %user.id, "login");

        Ok(AuthResponse {
            user: user.into(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Redeem an email verification code, marking the account verified
    pub async fn verify_email(&self, code: &str) -> AuthResult<SanitizedUser> {
        let code_id = parse_code(code).ok_or(AuthError::InvalidCode)?;

        let user = self
            .store
            .consume_code_verifying_user(code_id, CodePurpose::EmailVerification)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        info!(user_id = %user.id, "email verified");
        Ok(user.into())
    }

    /// Email a password reset link
    ///
    /// Rate limited per user: past the request limit inside the window the
    /// call fails instead of minting another code.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<String> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let window = Duration::from_std(self.codes.reset_request_window)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let recent = self
            .store
            .count_codes_since(user.id, CodePurpose::PasswordReset, Utc::now() - window)
            .await?;
        if recent >= self.codes.reset_request_limit {
            warn!(user_id = %user.id, "password reset rate limit hit");
            return Err(AuthError::TooManyRequests);
        }

        let ttl = Duration::from_std(self.codes.password_reset_ttl)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let expires_at = Utc::now() + ttl;
        let code = self
            .store
            .create_code(user.id, CodePurpose::PasswordReset, expires_at)
            .await?;

        let url = self
            .links
            .reset_password_url(&code.id.to_string(), expires_at.timestamp_millis());
        self.mailer
            .send_password_reset(&user.email, &url)
            .await
            .map_err(|e| AuthError::EmailDispatch(e.to_string()))?;

        Ok(url)
    }

    /// Redeem a reset code, set the new password, and revoke every session
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> AuthResult<SanitizedUser> {
        let code_id = parse_code(&req.verification_code).ok_or(AuthError::InvalidCode)?;
        let password_hash = self.hasher.hash(&req.password)?;

        let user = self
            .store
            .consume_code_resetting_password(code_id, &password_hash)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        info!(user_id = %user.id, "password reset, all sessions revoked");
        Ok(user.into())
    }
}

pub(crate) fn parse_code(code: &str) -> Option<Uuid> {
    Uuid::parse_str(code).ok()
}
