//! SQLite-backed user store
//!
//! Passwords are stored as Argon2id hashes; hashing and verification
//! run on the blocking pool so login traffic cannot stall the runtime.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
    password_hash::{PasswordHasher, SaltString, rand_core},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{UserStore, UserStoreError};
use crate::data::{EntityId, ExternalProfile, User};

pub struct SqlUserStore {
    pool: SqlitePool,
}

impl SqlUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_provider(
        &self,
        provider: &str,
        subject: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE provider = ? AND provider_user_id = ?
            "#,
        )
        .bind(provider)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_if_absent(&self, user: &User) -> Result<u64, UserStoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO users
                (id, email, display_name, disabled, password_hash, provider, provider_user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.disabled)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(&user.provider_user_id)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserStore for SqlUserStore {
    #[tracing::instrument(name = "Validating local credentials in SQLite", skip_all)]
    async fn find_local_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let Some(user) = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = ? AND password_hash IS NOT NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let Some(stored_hash) = user.password_hash.clone() else {
            return Ok(None);
        };

        let matches = verify_password_hash(stored_hash, password.to_string()).await?;
        Ok(matches.then_some(user))
    }

    #[tracing::instrument(
        name = "Resolving external identity in SQLite",
        skip_all,
        fields(provider = profile.provider.as_str())
    )]
    async fn find_or_create_external_user(
        &self,
        profile: &ExternalProfile,
    ) -> Result<User, UserStoreError> {
        let provider = profile.provider.as_str();
        if let Some(user) = self.fetch_by_provider(provider, &profile.subject).await? {
            return Ok(user);
        }

        let user = User {
            id: EntityId::new().0,
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            disabled: false,
            password_hash: None,
            provider: Some(provider.to_string()),
            provider_user_id: Some(profile.subject.clone()),
            created_at: Utc::now(),
        };

        // INSERT OR IGNORE keeps a concurrent first login from creating
        // two rows for the same identity.
        let inserted = self.insert_if_absent(&user).await?;
        if inserted == 0
            && self
                .fetch_by_provider(provider, &profile.subject)
                .await?
                .is_none()
        {
            // The ignored conflict was on email, not on the identity: the
            // address already belongs to another account. The provider
            // identity wins and the row is stored without an email.
            let mut unlinked = user.clone();
            unlinked.email = None;
            self.insert_if_absent(&unlinked).await?;
        }

        self.fetch_by_provider(provider, &profile.subject)
            .await?
            .ok_or_else(|| {
                UserStoreError::Unexpected(format!(
                    "user row missing after insert for {provider} identity"
                ))
            })
    }

    #[tracing::instrument(name = "Fetching user by ID from SQLite", skip_all)]
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[tracing::instrument(name = "Creating local user in SQLite", skip_all)]
    async fn create_local_user<'a>(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&'a str>,
    ) -> Result<User, UserStoreError> {
        let password_hash = compute_password_hash(password.to_string()).await?;

        let user = User {
            id: EntityId::new().0,
            email: Some(email.to_string()),
            display_name: display_name.map(str::to_string),
            disabled: false,
            password_hash: Some(password_hash),
            provider: None,
            provider_user_id: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, display_name, disabled, password_hash, provider, provider_user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.disabled)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(&user.provider_user_id)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if error
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                UserStoreError::UserAlreadyExists
            } else {
                UserStoreError::Database(error)
            }
        })?;

        Ok(user)
    }

    #[tracing::instrument(name = "Updating disabled flag in SQLite", skip_all)]
    async fn set_disabled(&self, id: &str, disabled: bool) -> Result<bool, UserStoreError> {
        let result = sqlx::query("UPDATE users SET disabled = ? WHERE id = ?")
            .bind(disabled)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn argon2() -> Result<Argon2<'static>, UserStoreError> {
    Ok(Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(15000, 2, 1, None).map_err(|e| UserStoreError::PasswordHash(e.to_string()))?,
    ))
}

async fn compute_password_hash(password: String) -> Result<String, UserStoreError> {
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        current_span.in_scope(|| {
            let salt = SaltString::generate(rand_core::OsRng);
            argon2()?
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| UserStoreError::PasswordHash(e.to_string()))
        })
    })
    .await
    .map_err(|e| UserStoreError::Unexpected(format!("password hashing task failed: {e}")))?
}

async fn verify_password_hash(
    expected_hash: String,
    candidate: String,
) -> Result<bool, UserStoreError> {
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        current_span.in_scope(|| {
            let parsed = PasswordHash::new(&expected_hash)
                .map_err(|e| UserStoreError::PasswordHash(e.to_string()))?;
            match argon2()?.verify_password(candidate.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                // A mismatch is a normal outcome, not a store failure
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(UserStoreError::PasswordHash(e.to_string())),
            }
        })
    })
    .await
    .map_err(|e| UserStoreError::Unexpected(format!("password verify task failed: {e}")))?
}
