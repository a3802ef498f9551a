/// Admin authorization guard
///
/// Every mutating endpoint runs [`require_admin`] before touching its body.
/// The session only identifies the caller; whether that caller is an admin is
/// always read from `users` for the current request, so revoking the flag in
/// the database takes effect immediately without invalidating cookies.

use crate::{
    api::{error::ApiError, AppState},
    auth::{
        session::session_tokens,
        storage::AuthStorage,
        types::{AdminIdentity, SessionRecord, User},
    },
};
use anyhow::Result;
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use chrono::{DateTime, Utc};

/// Resolve the first live session among `tokens`
///
/// Unknown tokens are skipped. Expired sessions are deleted and skipped.
pub async fn resolve_session(
    storage: &AuthStorage,
    tokens: &[String],
    now: DateTime<Utc>,
) -> Result<Option<SessionRecord>> {
    for token in tokens {
        match storage.find_session(token).await? {
            Some(session) if session.is_expired(now) => {
                tracing::debug!("⌛ Dropping expired session {}", session.id);
                storage.delete_session_by_id(&session.id).await?;
            }
            Some(session) => return Ok(Some(session)),
            None => tracing::debug!("🔍 Session cookie matches no stored session"),
        }
    }

    Ok(None)
}

/// Decide whether the request comes from an administrator
///
/// * no session cookie, or no live session behind it: 401
/// * live session whose user is not (or no longer) an admin: 403
/// * live session whose user cannot be found by id nor e-mail: 403
pub async fn require_admin(
    storage: &AuthStorage,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<AdminIdentity, ApiError> {
    let tokens = session_tokens(headers);
    if tokens.is_empty() {
        tracing::warn!("🚫 Admin request without a session cookie");
        return Err(ApiError::Unauthorized);
    }

    let Some(session) = resolve_session(storage, &tokens, now).await? else {
        tracing::warn!("🚫 Admin request with unknown or expired session");
        return Err(ApiError::Unauthorized);
    };

    match session_user(storage, &session).await? {
        Some(user) if user.is_admin => Ok(AdminIdentity {
            user_id: user.id,
            email: user.email,
        }),
        Some(user) => {
            tracing::warn!("🚫 Non-admin {} attempted an admin request", user.email);
            Err(ApiError::Forbidden)
        }
        None => {
            tracing::warn!("🚫 Session {} belongs to no known user", session.id);
            Err(ApiError::Forbidden)
        }
    }
}

/// Current user row of a session
///
/// The row may have been recreated under a new id; the e-mail still names the person.
async fn session_user(storage: &AuthStorage, session: &SessionRecord) -> Result<Option<User>> {
    if let Some(user) = storage.user_by_id(&session.user_id).await? {
        return Ok(Some(user));
    }

    tracing::debug!("🔍 Session user {} is gone, checking by e-mail", session.user_id);
    storage.user_by_email(&session.email).await
}

/// Session and current user row behind the request's cookie, if any
pub async fn current_session(
    storage: &AuthStorage,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Option<(SessionRecord, User)>> {
    let tokens = session_tokens(headers);
    let Some(session) = resolve_session(storage, &tokens, now).await? else {
        return Ok(None);
    };

    let user = session_user(storage, &session).await?;
    Ok(user.map(|user| (session, user)))
}

/// Extractor that rejects the request unless the caller is an admin
///
/// Place it first in a handler's argument list so the guard runs before the
/// body is read.
#[derive(Debug, Clone)]
pub struct AdminGuard(pub AdminIdentity);

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = require_admin(&state.auth, &parts.headers, Utc::now()).await?;
        Ok(Self(identity))
    }
}
