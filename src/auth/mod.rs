//! Authentication and session management
//!
//! Handles:
//! - Local email/password login
//! - OAuth flows for Facebook, Twitter and Google
//! - Session serialization and restoration
//! - Authentication middleware

mod authenticator;
mod gate;
mod middleware;
mod providers;
mod routes;
pub mod session;

pub use authenticator::Authenticator;
pub use gate::{LoginOutcome, RejectReason, validate_user_login};
pub use middleware::{CurrentUser, require_auth};
pub use providers::ProviderRegistry;
pub use routes::auth_router;
pub use session::{Session, create_session_token, verify_session_token};
