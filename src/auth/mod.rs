/// Authentication and admin authorization
///
/// This module handles everything between a browser cookie and the decision
/// "may this request mutate content":
/// - Google OAuth sign-in and the admin allowlist sync
/// - Database sessions behind opaque cookie tokens
/// - The admin guard used by every mutating endpoint

// Admin allowlist parsed from configuration
pub mod allowlist;

// The per-request admin guard and its axum extractor
pub mod guard;

// OAuth provider abstraction and the Google implementation
pub mod oauth;

// Cookie parsing, token generation and hashing
pub mod session;

// Users, accounts, sessions and OAuth state persistence
pub mod storage;

// Type definitions
pub mod types;

pub use allowlist::AdminAllowlist;
pub use guard::{require_admin, AdminGuard};
pub use oauth::{GoogleOAuth, OAuthProvider};
pub use storage::AuthStorage;
pub use types::{AdminIdentity, OAuthProfile, SessionRecord, User};
