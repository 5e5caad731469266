//! Magic-link flows: passwordless login and registration
//!
//! Both flows email a short-lived single-use code. Login requires an
//! existing account; registration pre-provisions an empty account when the
//! link is requested and activates it when the link is opened. Until then
//! the account has an empty password hash and cannot log in any other way.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use crate::account::parse_code;
use crate::config::{CodeConfig, LinkConfig};
use crate::error::{AuthError, AuthResult};
use crate::mailer::Mailer;
use crate::session::SessionService;
use crate::types::AuthResponse;
use hireboard_db::{AuthStore, CodePurpose, DbUser, NewUser, UserRole};

/// Magic-link service
#[derive(Clone)]
pub struct MagicLinkService {
    store: Arc<dyn AuthStore>,
    sessions: SessionService,
    mailer: Arc<dyn Mailer>,
    codes: CodeConfig,
    links: LinkConfig,
}

impl MagicLinkService {
    /// Create a new magic-link service
    pub fn new(
        store: Arc<dyn AuthStore>,
        sessions: SessionService,
        mailer: Arc<dyn Mailer>,
        codes: CodeConfig,
        links: LinkConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            mailer,
            codes,
            links,
        }
    }

    fn magic_ttl(&self) -> AuthResult<Duration> {
        Duration::from_std(self.codes.magic_link_ttl).map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Email a magic sign-in link to an existing account
    pub async fn send_login_link(&self, email: &str) -> AuthResult<()> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        let code = self
            .store
            .create_code(user.id, CodePurpose::MagicLogin, Utc::now() + self.magic_ttl()?)
            .await?;

        let url = self.links.magic_login_url(&code.id.to_string());
        self.mailer
            .send_magic_login(&user.email, &url)
            .await
            .map_err(|e| AuthError::EmailDispatch(e.to_string()))?;

        Ok(())
    }

    /// Redeem a magic sign-in code, opening a new session
    pub async fn verify_login_link(&self, code: &str) -> AuthResult<AuthResponse> {
        let code_id = parse_code(code).ok_or(AuthError::InvalidMagicLink)?;

        let spent = self
            .store
            .consume_code(code_id, CodePurpose::MagicLogin)
            .await?
            .ok_or(AuthError::InvalidMagicLink)?;

        let user = self
            .store
            .find_user_by_id(spent.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(user_id = %user.id, "magic login");
        self.open_for(user).await
    }

    /// Email a magic sign-up link, pre-provisioning an empty account
    pub async fn send_register_link(&self, email: &str) -> AuthResult<()> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                full_name: String::new(),
                password_hash: String::new(),
                role: UserRole::Candidate,
                verified: false,
            })
            .await
            .map_err(|e| match e.into() {
                AuthError::EmailInUse => AuthError::EmailAlreadyRegistered,
                other => other,
            })?;

        let code = self
            .store
            .create_code(
                user.id,
                CodePurpose::MagicRegister,
                Utc::now() + self.magic_ttl()?,
            )
            .await?;

        let url = self.links.magic_register_url(&code.id.to_string());
        self.mailer
            .send_magic_register(&user.email, &url)
            .await
            .map_err(|e| AuthError::EmailDispatch(e.to_string()))?;

        Ok(())
    }

    /// Redeem a magic sign-up code, activating the account
    ///
    /// Marks the pre-provisioned account verified and opens its first
    /// session.
    pub async fn verify_register_link(&self, code: &str) -> AuthResult<AuthResponse> {
        let code_id = parse_code(code).ok_or(AuthError::InvalidMagicLink)?;

        let user = self
            .store
            .consume_code_verifying_user(code_id, CodePurpose::MagicRegister)
            .await?
            .ok_or(AuthError::InvalidMagicLink)?;

        info!(user_id = %user.id, "magic registration completed");
        self.open_for(user).await
    }

    async fn open_for(&self, user: DbUser) -> AuthResult<AuthResponse> {
        let session = self.sessions.open_session(user.id, None).await?;
        let pair = self.sessions.issue_pair(user.id, user.role, session.id)?;
        Ok(AuthResponse {
            user: user.into(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }
}
