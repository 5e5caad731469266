//! Hireboard Authentication Layer
//!
//! Authentication for the hireboard platform supporting:
//!
//! - **JWT Authentication**: access tokens + session-bound refresh tokens,
//!   each kind signed with its own secret
//! - **Session Management**: server-side sessions with sliding renewal
//! - **Password Security**: Argon2id hashing (OWASP recommended)
//! - **Email Verification**: single-use codes behind emailed links
//! - **Password Reset**: rate-limited, revokes all sessions on success
//! - **Magic Links**: passwordless login and registration
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Authentication Flow                      │
//! ├────────────────────────────────────────────────────────────┤
//! │  Request → AuthLayer → [RoleLayer] → Handler               │
//! │                │                                           │
//! │                ▼                                           │
//! │          TokenService                                      │
//! │                │                                           │
//! │                ▼                                           │
//! │        AuthenticatedUser                                   │
//! │                                                            │
//! │  AccountService / MagicLinkService / SessionService        │
//! │                │                                           │
//! │                ▼                                           │
//! │           AuthStore  ──  Mailer                            │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod account;
pub mod config;
pub mod error;
pub mod magic;
pub mod mailer;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;
pub mod types;

pub use account::AccountService;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult, ErrorResponse};
pub use magic::MagicLinkService;
pub use mailer::{LogMailer, Mailer};
pub use middleware::{AuthLayer, AuthMiddleware, RequireAuth, RoleLayer};
pub use password::PasswordService;
pub use session::SessionService;
pub use token::TokenService;
pub use types::*;

use hireboard_db::{AuthStore, UserRole};
use std::sync::Arc;

/// Main authentication service combining all auth components
#[derive(Clone)]
pub struct AuthService {
    pub tokens: TokenService,
    pub password: PasswordService,
    pub sessions: SessionService,
    pub accounts: AccountService,
    pub magic: MagicLinkService,
    store: Arc<dyn AuthStore>,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new auth service with all components
    pub fn new(store: Arc<dyn AuthStore>, mailer: Arc<dyn Mailer>, config: AuthConfig) -> Self {
        let tokens = TokenService::new(config.jwt.clone());
        let password = PasswordService::new(config.password.clone());
        let sessions = SessionService::new(store.clone(), tokens.clone(), config.session.clone());
        let accounts = AccountService::new(
            store.clone(),
            password.clone(),
            sessions.clone(),
            mailer.clone(),
            config.codes.clone(),
            config.links.clone(),
        );
        let magic = MagicLinkService::new(
            store.clone(),
            sessions.clone(),
            mailer,
            config.codes.clone(),
            config.links.clone(),
        );

        Self {
            tokens,
            password,
            sessions,
            accounts,
            magic,
            store,
            config,
        }
    }

    /// Get the store reference
    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    /// Get the config reference
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an auth layer for an Axum router
    pub fn layer(&self) -> AuthLayer {
        AuthLayer::new(Arc::new(self.tokens.clone()))
    }

    /// Create a role gate for an Axum router; stacks after [`AuthService::layer`]
    pub fn role_layer(&self, allowed: Vec<UserRole>) -> RoleLayer {
        RoleLayer::new(self.store.clone(), allowed)
    }
}
