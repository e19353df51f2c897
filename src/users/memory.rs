//! In-process user store
//!
//! Backs tests and local tooling. Passwords are compared verbatim,
//! so nothing built on this store should ever face real traffic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{UserStore, UserStoreError};
use crate::data::{EntityId, ExternalProfile, User};

#[derive(Clone)]
struct MemoryUser {
    user: User,
    password: Option<String>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, MemoryUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_local_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserStoreError> {
        let users = self.users.read().await;
        let user = users
            .values()
            .find(|entry| {
                entry.user.email.as_deref() == Some(email)
                    && entry.password.as_deref() == Some(password)
            })
            .map(|entry| entry.user.clone());
        Ok(user)
    }

    async fn find_or_create_external_user(
        &self,
        profile: &ExternalProfile,
    ) -> Result<User, UserStoreError> {
        let provider = profile.provider.as_str();
        let mut users = self.users.write().await;

        if let Some(entry) = users.values().find(|entry| {
            entry.user.provider.as_deref() == Some(provider)
                && entry.user.provider_user_id.as_deref() == Some(profile.subject.as_str())
        }) {
            return Ok(entry.user.clone());
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
        users.insert(
            user.id.clone(),
            MemoryUser {
                user: user.clone(),
                password: None,
            },
        );
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UserStoreError> {
        let users = self.users.read().await;
        Ok(users.get(id).map(|entry| entry.user.clone()))
    }

    async fn create_local_user<'a>(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&'a str>,
    ) -> Result<User, UserStoreError> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|entry| entry.user.email.as_deref() == Some(email))
        {
            return Err(UserStoreError::UserAlreadyExists);
        }

        let user = User {
            id: EntityId::new().0,
            email: Some(email.to_string()),
            display_name: display_name.map(str::to_string),
            disabled: false,
            password_hash: None,
            provider: None,
            provider_user_id: None,
            created_at: Utc::now(),
        };
        users.insert(
            user.id.clone(),
            MemoryUser {
                user: user.clone(),
                password: Some(password.to_string()),
            },
        );
        Ok(user)
    }

    async fn set_disabled(&self, id: &str, disabled: bool) -> Result<bool, UserStoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(entry) => {
                entry.user.disabled = disabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
