//! The authentication adapter
//!
//! One adapter serves every strategy: a strategy resolves an identity
//! to a stored user, then the shared gate decides whether a session
//! may be issued.

use std::sync::Arc;

use super::gate::{LoginOutcome, RejectReason, validate_user_login};
use crate::data::{ExternalProfile, User};
use crate::error::Result;
use crate::users::UserStore;

pub struct Authenticator {
    store: Arc<dyn UserStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Local email/password login
    pub async fn login_local(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        match self.store.find_local_user(email, password).await? {
            // An unknown email and a wrong password look identical to the
            // caller; both carry the same rejection message.
            None => Ok(LoginOutcome::Rejected(RejectReason::IncorrectCredentials)),
            Some(user) => Ok(validate_user_login(Some(user))),
        }
    }

    /// Login with a profile fetched from an external provider
    pub async fn login_external(&self, profile: &ExternalProfile) -> Result<LoginOutcome> {
        let user = self.store.find_or_create_external_user(profile).await?;
        Ok(validate_user_login(Some(user)))
    }

    /// Reduce a user to the value stored in the session
    pub fn serialize_user(&self, user: &User) -> String {
        user.id.clone()
    }

    /// Load the user a session points at
    ///
    /// A missing row comes back as `Ok(None)`; callers decide whether
    /// that means signed out or unauthorized.
    pub async fn restore(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.store.find_by_id(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Provider;
    use crate::error::AppError;
    use crate::users::{MemoryUserStore, MockUserStore, UserStoreError};

    fn google_profile() -> ExternalProfile {
        ExternalProfile {
            provider: Provider::Google,
            subject: "google-subject-1".to_string(),
            email: Some("ada@example.com".to_string()),
            display_name: Some("Ada".to_string()),
        }
    }

    async fn seeded_store() -> Arc<MemoryUserStore> {
        let store = Arc::new(MemoryUserStore::new());
        store
            .create_local_user("ada@example.com", "correct horse", Some("Ada"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_local_login_succeeds_with_valid_credentials() {
        let authenticator = Authenticator::new(seeded_store().await);

        let outcome = authenticator
            .login_local("ada@example.com", "correct horse")
            .await
            .unwrap();
        match outcome {
            LoginOutcome::Success(user) => {
                assert_eq!(user.email.as_deref(), Some("ada@example.com"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_login_rejects_wrong_password() {
        let authenticator = Authenticator::new(seeded_store().await);

        let outcome = authenticator
            .login_local("ada@example.com", "wrong password")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::Rejected(RejectReason::IncorrectCredentials)
        );
    }

    #[tokio::test]
    async fn test_local_login_rejects_unknown_email_with_same_reason() {
        let authenticator = Authenticator::new(seeded_store().await);

        let outcome = authenticator
            .login_local("nobody@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::Rejected(RejectReason::IncorrectCredentials)
        );
    }

    #[tokio::test]
    async fn test_local_login_rejects_disabled_account() {
        let store = seeded_store().await;
        let user = store
            .find_local_user("ada@example.com", "correct horse")
            .await
            .unwrap()
            .unwrap();
        store.set_disabled(&user.id, true).await.unwrap();

        let authenticator = Authenticator::new(store);
        let outcome = authenticator
            .login_local("ada@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(outcome, LoginOutcome::Rejected(RejectReason::UserDisabled));
    }

    #[tokio::test]
    async fn test_external_login_reuses_the_first_user_row() {
        let authenticator = Authenticator::new(Arc::new(MemoryUserStore::new()));

        let first = authenticator
            .login_external(&google_profile())
            .await
            .unwrap();
        let second = authenticator
            .login_external(&google_profile())
            .await
            .unwrap();

        match (first, second) {
            (LoginOutcome::Success(a), LoginOutcome::Success(b)) => assert_eq!(a.id, b.id),
            other => panic!("expected two successes, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_external_login_rejects_disabled_account() {
        let store = Arc::new(MemoryUserStore::new());
        let authenticator = Authenticator::new(store.clone());

        let outcome = authenticator
            .login_external(&google_profile())
            .await
            .unwrap();
        let LoginOutcome::Success(user) = outcome else {
            panic!("first login must succeed");
        };
        store.set_disabled(&user.id, true).await.unwrap();

        let outcome = authenticator
            .login_external(&google_profile())
            .await
            .unwrap();
        assert_eq!(outcome, LoginOutcome::Rejected(RejectReason::UserDisabled));
    }

    #[tokio::test]
    async fn test_serialize_then_restore_round_trips() {
        let store = seeded_store().await;
        let user = store
            .find_local_user("ada@example.com", "correct horse")
            .await
            .unwrap()
            .unwrap();

        let authenticator = Authenticator::new(store);
        let serialized = authenticator.serialize_user(&user);
        assert_eq!(serialized, user.id);

        let restored = authenticator.restore(&serialized).await.unwrap();
        assert_eq!(restored, Some(user));
    }

    #[tokio::test]
    async fn test_restore_unknown_id_returns_none() {
        let authenticator = Authenticator::new(Arc::new(MemoryUserStore::new()));

        let restored = authenticator
            .restore("01UNKNOWNIDENTIFIER0000000")
            .await
            .unwrap();
        assert_eq!(restored, None);
    }

    #[tokio::test]
    async fn test_local_store_failure_surfaces_as_error_not_rejection() {
        let mut mock = MockUserStore::new();
        mock.expect_find_local_user()
            .returning(|_, _| Err(UserStoreError::Unexpected("store offline".to_string())));

        let authenticator = Authenticator::new(Arc::new(mock));
        let error = authenticator
            .login_local("ada@example.com", "correct horse")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::UserStore(_)));
    }

    #[tokio::test]
    async fn test_external_store_failure_surfaces_as_error_not_rejection() {
        let mut mock = MockUserStore::new();
        mock.expect_find_or_create_external_user()
            .returning(|_| Err(UserStoreError::Unexpected("store offline".to_string())));

        let authenticator = Authenticator::new(Arc::new(mock));
        let error = authenticator
            .login_external(&google_profile())
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::UserStore(_)));
    }
}
