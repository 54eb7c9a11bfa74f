//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::middleware::rate_limit::{GovernorRateLimitStore, RateLimitStore};
use crate::services::email::EmailService;
use crate::services::payments::{PaymentError, StripeClient};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] SmtpError),
    #[error("invalid payment configuration: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    rate_limiter: Arc<dyn RateLimitStore>,
    email: Option<EmailService>,
    stripe: Option<StripeClient>,
}

impl AppState {
    /// Create the application state with the in-memory rate limiter.
    ///
    /// Email and card payments are enabled only when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        Self::with_rate_limiter(config, pool, Arc::new(GovernorRateLimitStore::default()))
    }

    /// Create the application state with a caller-supplied rate limit store.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or the HTTP client cannot be built.
    pub fn with_rate_limiter(
        config: StorefrontConfig,
        pool: PgPool,
        rate_limiter: Arc<dyn RateLimitStore>,
    ) -> Result<Self, StateError> {
        let email = config.smtp.as_ref().map(EmailService::new).transpose()?;
        let stripe = config.stripe.as_ref().map(StripeClient::new).transpose()?;

        if email.is_none() {
            tracing::warn!("SMTP not configured; order emails are disabled");
        }
        if stripe.is_none() {
            tracing::warn!("Stripe not configured; card payments are disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                rate_limiter,
                email,
                stripe,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the rate limit store.
    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimitStore {
        self.inner.rate_limiter.as_ref()
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Get the Stripe client, if card payments are configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! State for router tests that never reach the database.

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    /// Configuration with payments and email disabled.
    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost:1/unused"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k7Qz9pL2mX4vB8nR1tY6wE3uI0oA5sD7"),
            stripe: None,
            smtp: None,
            reviews_enabled: true,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// State backed by a lazy pool that is never connected.
    pub(crate) fn test_state(config: StorefrontConfig) -> AppState {
        #[allow(clippy::unwrap_used)]
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(250))
            .connect_lazy("postgres://localhost:1/unused")
            .unwrap();
        #[allow(clippy::unwrap_used)]
        AppState::new(config, pool).unwrap()
    }
}
