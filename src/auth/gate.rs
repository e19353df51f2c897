//! Shared login validation
//!
//! Every strategy funnels its lookup result through [`validate_user_login`]
//! so the account checks cannot drift between providers.

use std::fmt;

use crate::data::User;

/// Why a login attempt was turned away
///
/// Rejections are expected outcomes, not errors; store and provider
/// failures travel separately as `AppError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No account matches the looked-up identity
    UserNotFound,
    /// The account exists but has been disabled
    UserDisabled,
    /// Local email/password pair did not match
    IncorrectCredentials,
}

impl RejectReason {
    /// Message shown to the client
    pub fn message(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user not found",
            Self::UserDisabled => "user disabled",
            Self::IncorrectCredentials => "Incorrect email/password combination",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a login attempt that reached the validation gate
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Success(User),
    Rejected(RejectReason),
}

/// Validate a looked-up account before a session may be issued
///
/// Order matters: a missing account is reported before the disabled
/// flag is ever consulted.
pub fn validate_user_login(user: Option<User>) -> LoginOutcome {
    match user {
        None => LoginOutcome::Rejected(RejectReason::UserNotFound),
        Some(user) if user.disabled => LoginOutcome::Rejected(RejectReason::UserDisabled),
        Some(user) => LoginOutcome::Success(user),
    }
}
