//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! ap-cli admin promote -e ops@annaparis.com -p '...' -n "Ops"
//! ```
//!
//! # Environment Variables
//!
//! - `SHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;

use anna_paris_core::{Email, UserId, UserRole};
use anna_paris_storefront::db::{RepositoryError, UserRepository};
use anna_paris_storefront::services::auth::{AuthError, hash_password};

use super::{ConnectError, connect};

/// Shortest password accepted for an admin account.
const MIN_ADMIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password too short.
    #[error("Password must be at least {MIN_ADMIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("Password hashing failed: {0}")]
    Hash(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a user with the admin role, or promote an existing one.
///
/// The password is always replaced.
///
/// # Returns
///
/// The ID of the admin user.
///
/// # Errors
///
/// Returns an error if the input is invalid or the database write fails.
pub async fn promote(email: &str, password: &str, name: &str) -> Result<UserId, AdminError> {
    let email = Email::normalized(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let password = password.trim();
    if password.chars().count() < MIN_ADMIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }
    let name = Some(name.trim()).filter(|n| !n.is_empty());

    let pool = connect().await?;
    let password_hash = hash_password(password)?;

    let user = UserRepository::new(&pool)
        .upsert_with_role(&email, name, &password_hash, UserRole::Admin)
        .await?;

    tracing::info!(
        "Admin user ready! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}
