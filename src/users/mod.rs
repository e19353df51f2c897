//! User storage port and adapters
//!
//! `UserStore` is the seam between the authentication layer and
//! persistence. Two adapters ship with the crate:
//! - [`SqlUserStore`]: SQLite-backed, used in production
//! - [`MemoryUserStore`]: in-process HashMap, used by tests and local tooling

mod memory;
mod sql;

pub use memory::MemoryUserStore;
pub use sql::SqlUserStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::data::{ExternalProfile, User};

/// Errors surfaced by user store adapters
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("user already exists")]
    UserAlreadyExists,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hash error: {0}")]
    PasswordHash(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Persistence operations the authentication layer depends on
///
/// Lookup misses are `Ok(None)`, never errors; an `Err` always means
/// the store itself failed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a local user whose email and password both match
    ///
    /// Returns `Ok(None)` for an unknown email or a wrong password.
    async fn find_local_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserStoreError>;

    /// Find the user linked to an external identity, creating the row
    /// on first login
    ///
    /// Calling this twice with the same profile yields the same user.
    async fn find_or_create_external_user(
        &self,
        profile: &ExternalProfile,
    ) -> Result<User, UserStoreError>;

    /// Look up a user by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UserStoreError>;

    /// Register a local email/password user
    async fn create_local_user<'a>(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&'a str>,
    ) -> Result<User, UserStoreError>;

    /// Flip the disabled flag; returns false when the ID is unknown
    async fn set_disabled(&self, id: &str, disabled: bool) -> Result<bool, UserStoreError>;
}
