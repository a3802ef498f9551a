/// Sign-in, sign-out and session endpoints
///
/// The OAuth dance: `signin` stores a single-use state and redirects to the
/// provider, `callback` checks the state, exchanges the code, syncs the admin
/// flag from the allowlist and sets the session cookie.

use crate::{
    api::{error::ApiError, AppState},
    auth::{
        guard::current_session,
        session::{cleared_session_cookie, session_cookie, session_tokens},
    },
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

/// Where the browser lands after a successful sign-in
const AFTER_SIGN_IN: &str = "/admin";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user cancelled or the request was refused
    pub error: Option<String>,
}

/// Create authentication routes
pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin/{provider}", get(sign_in))
        .route("/api/auth/callback/{provider}", get(callback))
        .route("/api/auth/signout", post(sign_out))
        .route("/api/auth/session", get(session))
}

fn redirect_uri(state: &AppState) -> String {
    format!(
        "{}/api/auth/callback/{}",
        state.config.server.public_url,
        state.oauth.id()
    )
}

/// GET /api/auth/signin/{provider}
/// Redirects (303) to the provider's consent screen
async fn sign_in(State(state): State<AppState>, Path(provider): Path<String>) -> Result<Redirect, ApiError> {
    if provider != state.oauth.id() {
        return Err(ApiError::NotFound("Sign-in provider"));
    }

    let oauth_state = state.auth.issue_state(Utc::now()).await?;
    let url = state.oauth.authorize_url(&oauth_state, &redirect_uri(&state))?;

    tracing::debug!("🔑 Redirecting to {} sign-in", provider);
    Ok(Redirect::to(&url))
}

/// GET /api/auth/callback/{provider}?code=...&state=...
/// Sets the session cookie and redirects (303) to the admin area
async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    if provider != state.oauth.id() {
        return Err(ApiError::NotFound("Sign-in provider"));
    }
    if let Some(error) = query.error {
        tracing::warn!("❌ Provider refused sign-in: {}", error);
        return Err(ApiError::bad_request(format!("Sign-in failed: {}", error)));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(ApiError::bad_request("Missing code or state"));
    };

    let now = Utc::now();
    if !state.auth.consume_state(&oauth_state, now).await? {
        tracing::warn!("❌ Sign-in callback with unknown or expired state");
        return Err(ApiError::bad_request("Invalid or expired sign-in state"));
    }

    let profile = state.oauth.exchange(&code, &redirect_uri(&state)).await?;
    let max_age = Duration::try_days(state.config.auth.session_max_age_days)
        .filter(|age| *age > Duration::zero())
        .ok_or_else(|| anyhow::anyhow!("Invalid session lifetime: {} days", state.config.auth.session_max_age_days))?;
    let (token, session) = state.auth.sign_in(&profile, &state.allowlist, max_age, now).await?;

    tracing::info!("🔓 {} signed in (admin: {})", session.email, session.is_admin);

    let cookie = session_cookie(&token, max_age.num_seconds(), state.config.secure_cookies());
    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, AFTER_SIGN_IN.to_string()),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response())
}

/// POST /api/auth/signout
/// Deletes the session and expires the cookie
async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let mut removed = 0;
    for token in session_tokens(&headers) {
        if state.auth.delete_session(&token).await? {
            removed += 1;
        }
    }
    tracing::debug!("🔒 Signed out ({} sessions removed)", removed);

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, cleared_session_cookie(true)),
            (header::SET_COOKIE, cleared_session_cookie(false)),
        ]),
        Json(json!({ "message": "Signed out" })),
    )
        .into_response())
}

/// GET /api/auth/session
/// Returns: { "user": { ..., "isAdmin": true }, "expires": "..." } or null
///
/// `isAdmin` is read from the user row, so it reflects revocations immediately.
async fn session(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let Some((session, user)) = current_session(&state.auth, &headers, Utc::now()).await? else {
        return Ok(Json(Value::Null));
    };

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "image": user.image,
            "isAdmin": user.is_admin,
        },
        "expires": session.expires,
    })))
}
