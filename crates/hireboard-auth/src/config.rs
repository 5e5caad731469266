//! Authentication configuration
//!
//! Centralized configuration for all authentication components with
//! secure defaults following OWASP recommendations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Password hashing configuration
    pub password: PasswordConfig,
    /// Session configuration
    pub session: SessionConfig,
    /// One-time code configuration
    pub codes: CodeConfig,
    /// Frontend link configuration
    pub links: LinkConfig,
}

/// JWT token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing access tokens (should be at least 256 bits)
    pub access_secret: String,
    /// Secret key for signing refresh tokens, distinct from the access secret
    pub refresh_secret: String,
    /// Access token lifetime
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,
    /// Refresh token lifetime
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
    /// Token audience claim
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),  // Must be set in production
            refresh_secret: String::new(), // Must be set in production
            access_token_lifetime: Duration::from_secs(15 * 60), // 15 minutes
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            audience: "user".to_string(),
        }
    }
}

/// Password hashing configuration (Argon2id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB (OWASP recommends 19456 KiB = 19 MiB minimum)
    pub memory_cost: u32,
    /// Time cost (iterations) - OWASP recommends 2 minimum
    pub time_cost: u32,
    /// Parallelism factor
    pub parallelism: u32,
    /// Output hash length in bytes
    pub hash_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            // OWASP recommended values for Argon2id
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
            hash_length: 32,
        }
    }
}

/// Session management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
    /// Remaining lifetime below which a refresh also renews the session
    #[serde(with = "humantime_serde")]
    pub renewal_threshold: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            renewal_threshold: Duration::from_secs(24 * 60 * 60), // 24 hours
        }
    }
}

/// One-time verification code configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Email verification code lifetime
    #[serde(with = "humantime_serde")]
    pub email_verification_ttl: Duration,
    /// Password reset code lifetime
    #[serde(with = "humantime_serde")]
    pub password_reset_ttl: Duration,
    /// Magic login/register code lifetime
    #[serde(with = "humantime_serde")]
    pub magic_link_ttl: Duration,
    /// Maximum password reset requests per user per window
    pub reset_request_limit: u64,
    /// Window over which reset requests are counted
    #[serde(with = "humantime_serde")]
    pub reset_request_window: Duration,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            email_verification_ttl: Duration::from_secs(365 * 24 * 60 * 60), // 1 year
            password_reset_ttl: Duration::from_secs(60 * 60),                // 1 hour
            magic_link_ttl: Duration::from_secs(5 * 60),                     // 5 minutes
            reset_request_limit: 3,
            reset_request_window: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

/// Frontend URLs embedded in outbound emails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Frontend origin, no trailing slash
    pub app_origin: String,
    /// Email verification landing page
    pub verify_email_path: String,
    /// Password reset landing page
    pub reset_password_path: String,
    /// Magic login landing page
    pub magic_login_path: String,
    /// Magic registration landing page
    pub magic_register_path: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            app_origin: "http://localhost:3000".to_string(),
            verify_email_path: "confirm-account".to_string(),
            reset_password_path: "reset-password".to_string(),
            magic_login_path: "signin/magic".to_string(),
            magic_register_path: "signup-with-link/magic".to_string(),
        }
    }
}

impl LinkConfig {
    /// Email verification landing URL
    pub fn verify_email_url(&self, code: &str) -> String {
        format!("{}/{}?code={}", self.app_origin, self.verify_email_path, code)
    }

    /// Password reset landing URL; carries the expiry so the page can warn
    /// before submission
    pub fn reset_password_url(&self, code: &str, expires_at_millis: i64) -> String {
        format!(
            "{}/{}?code={}&expiresAt={}",
            self.app_origin, self.reset_password_path, code, expires_at_millis
        )
    }

    /// Magic login landing URL
    pub fn magic_login_url(&self, code: &str) -> String {
        format!("{}/{}?code={}", self.app_origin, self.magic_login_path, code)
    }

    /// Magic registration landing URL
    pub fn magic_register_url(&self, code: &str) -> String {
        format!(
            "{}/{}?code={}",
            self.app_origin, self.magic_register_path, code
        )
    }
}

impl AuthConfig {
    /// Defaults overlaid with the deployment-specific environment variables:
    /// `JWT_SECRET`, `JWT_REFRESH_SECRET`, and `APP_ORIGIN`. Everything else
    /// keeps its default; a missing secret is caught by [`AuthConfig::validate`].
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.jwt.access_secret = secret;
        }
        if let Ok(secret) = std::env::var("JWT_REFRESH_SECRET") {
            config.jwt.refresh_secret = secret;
        }
        if let Ok(origin) = std::env::var("APP_ORIGIN") {
            config.links.app_origin = origin;
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.jwt.access_secret.is_empty() {
            errors.push("JWT access secret must be set".to_string());
        } else if self.jwt.access_secret.len() < 32 {
            errors.push("JWT access secret should be at least 256 bits (32 bytes)".to_string());
        }

        if self.jwt.refresh_secret.is_empty() {
            errors.push("JWT refresh secret must be set".to_string());
        } else if self.jwt.refresh_secret.len() < 32 {
            errors.push("JWT refresh secret should be at least 256 bits (32 bytes)".to_string());
        }

        if !self.jwt.access_secret.is_empty() && self.jwt.access_secret == self.jwt.refresh_secret {
            errors.push("Access and refresh secrets must differ".to_string());
        }

        if self.password.memory_cost < 19456 {
            errors.push(
                "Argon2 memory cost should be at least 19456 KiB (OWASP recommendation)"
                    .to_string(),
            );
        }
        if self.password.time_cost < 2 {
            errors.push("Argon2 time cost should be at least 2 (OWASP recommendation)".to_string());
        }

        if self.session.renewal_threshold >= self.session.lifetime {
            errors.push("Session renewal threshold must be below the session lifetime".to_string());
        }

        if self.links.app_origin.ends_with('/') {
            errors.push("App origin must not have a trailing slash".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
