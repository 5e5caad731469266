//! Outbound email delivery
//!
//! The auth flows only need to hand a recipient and a link to something
//! that delivers it, so delivery sits behind the [`Mailer`] trait. The
//! default [`LogMailer`] writes the link to the log, which is enough for
//! local development; production wires in an SMTP or API-backed sender.

use async_trait::async_trait;
use tracing::info;

/// Sends the transactional emails the auth flows produce
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Email verification link for a new account
    async fn send_verification(&self, to: &str, url: &str) -> anyhow::Result<()>;

    /// Password reset link
    async fn send_password_reset(&self, to: &str, url: &str) -> anyhow::Result<()>;

    /// Magic sign-in link for an existing account
    async fn send_magic_login(&self, to: &str, url: &str) -> anyhow::Result<()>;

    /// Magic sign-up link for a new account
    async fn send_magic_register(&self, to: &str, url: &str) -> anyhow::Result<()>;
}

/// Mailer that logs instead of sending
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, url: &str) -> anyhow::Result<()> {
        info!(to = %to, url = %url, "email verification link");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, url: &str) -> anyhow::Result<()> {
        info!(to = %to, url = %url, "password reset link");
        Ok(())
    }

    async fn send_magic_login(&self, to: &str, url: &str) -> anyhow::Result<()> {
        info!(to = %to, url = %url, "magic login link");
        Ok(())
    }

    async fn send_magic_register(&self, to: &str, url: &str) -> anyhow::Result<()> {
        info!(to = %to, url = %url, "magic registration link");
        Ok(())
    }
}

#[cfg(any(test, feature = "mock"))]
pub use memory::{MemoryMailer, SentMail};

#[cfg(any(test, feature = "mock"))]
mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// A sent email captured by [`MemoryMailer`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMail {
        pub kind: &'static str,
        pub to: String,
        pub url: String,
    }

    /// Mailer that records sends in memory, for tests
    #[derive(Clone, Default)]
    pub struct MemoryMailer {
        sent: Arc<Mutex<Vec<SentMail>>>,
        fail: Arc<AtomicBool>,
    }

    impl MemoryMailer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent send fail
        pub fn fail_sends(&self) {
            self.fail.store(true, Ordering::SeqCst);
        }

        /// Everything sent so far
        pub fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }

        fn record(&self, kind: &'static str, to: &str, url: &str) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("smtp unavailable");
            }
            self.sent.lock().unwrap().push(SentMail {
                kind,
                to: to.to_string(),
                url: url.to_string(),
            });
            Ok(())
        }
    }

    #[async_trait]
    impl Mailer for MemoryMailer {
        async fn send_verification(&self, to: &str, url: &str) -> anyhow::Result<()> {
            self.record("verification", to, url)
        }

        async fn send_password_reset(&self, to: &str, url: &str) -> anyhow::Result<()> {
            self.record("password_reset", to, url)
        }

        async fn send_magic_login(&self, to: &str, url: &str) -> anyhow::Result<()> {
            self.record("magic_login", to, url)
        }

        async fn send_magic_register(&self, to: &str, url: &str) -> anyhow::Result<()> {
            self.record("magic_register", to, url)
        }
    }
}
