//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// An account that can sign in
///
/// A user holds exactly one kind of credential:
/// - local accounts carry `password_hash` and a required `email`
/// - external accounts carry `provider` + `provider_user_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// Login email; absent when an external provider did not share one
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Disabled accounts keep their row but cannot sign in
    pub disabled: bool,
    /// Argon2 hash, never the plaintext password
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// External provider that owns this identity (e.g. "google")
    pub provider: Option<String>,
    /// Stable user ID at the external provider
    pub provider_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Provider
// =============================================================================

/// Supported external login providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Facebook,
    Twitter,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Facebook, Provider::Twitter, Provider::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::Google => "google",
        }
    }

    /// Parse a provider from its route segment
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "facebook" => Some(Self::Facebook),
            "twitter" => Some(Self::Twitter),
            "google" => Some(Self::Google),
            _ => None,
        }
    }
}

/// Identity details fetched from an external provider after OAuth
///
/// `subject` is the provider's stable user ID; everything else is
/// best-effort profile data.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalProfile {
    pub provider: Provider,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_route_segment() {
        for provider in Provider::ALL {
            assert_eq!(Provider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::parse("myspace"), None);
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            id: EntityId::new().0,
            email: Some("ada@example.com".to_string()),
            display_name: Some("Ada".to_string()),
            disabled: false,
            password_hash: Some("argon2-hash".to_string()),
            provider: None,
            provider_user_id: None,
            created_at: Utc::now(),
        };

        let rendered = serde_json::to_string(&user).unwrap();
        assert!(rendered.contains("ada@example.com"));
        assert!(!rendered.contains("argon2-hash"));
        assert!(!rendered.contains("password_hash"));
    }
}
