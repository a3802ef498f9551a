/// Sign-in and session type definitions

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A person who signed in at least once
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    /// Always stored lower-cased
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    /// The only authorization flag, kept in sync with the admin allowlist
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted database session
///
/// `email` and `is_admin` are the payload captured at sign-in. They describe
/// who the session was issued to, not what that person may do now.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
    pub expires: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// Proof that the caller passed the admin guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub user_id: String,
    pub email: String,
}

/// Identity and tokens returned by an OAuth provider after a code exchange
#[derive(Debug, Clone, Default)]
pub struct OAuthProfile {
    /// Provider id (e.g., "google")
    pub provider: String,
    /// Stable subject id at the provider
    pub provider_account_id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: Option<i64>,
    pub id_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}
