/// Session cookie handling
///
/// The cookie carries an opaque random token. The database only ever sees an
/// HMAC of it, keyed by the session secret.

use anyhow::Result;
use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

/// Cookie name used over plain http
pub const SESSION_COOKIE: &str = "showcase.session-token";
/// Cookie name used when the site is served over https
pub const SECURE_SESSION_COOKIE: &str = "__Secure-showcase.session-token";

/// Generate a fresh session (or OAuth state) token: 256 bits from two v4 UUIDs
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Keyed hash of a token, as stored in `sessions.session_token_hash`
pub fn hash_token(secret: &str, token: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid session secret: {}", e))?;
    mac.update(token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Collect session tokens from every `Cookie` header
///
/// Secure-prefixed cookies come first, then plain ones. Empty values and
/// duplicates are dropped.
pub fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    let mut secure = Vec::new();
    let mut plain = Vec::new();

    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };

        for pair in raw.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            if value.is_empty() {
                continue;
            }

            match name.trim() {
                SECURE_SESSION_COOKIE => secure.push(value.to_string()),
                SESSION_COOKIE => plain.push(value.to_string()),
                _ => {}
            }
        }
    }

    let mut tokens = secure;
    for token in plain {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens.dedup();
    tokens
}

/// `Set-Cookie` value that stores a new session
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    if secure {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Secure; Max-Age={}",
            SECURE_SESSION_COOKIE, token, max_age_secs
        )
    } else {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, token, max_age_secs
        )
    }
}

/// `Set-Cookie` value that removes the session cookie
pub fn cleared_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn secure_cookie_wins_over_plain_one() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; showcase.session-token=plain; other=1"),
        );
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("__Secure-showcase.session-token=\"secure\""),
        );

        assert_eq!(session_tokens(&headers), vec!["secure".to_string(), "plain".to_string()]);
    }

    #[test]
    fn empty_and_foreign_cookies_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("showcase.session-token=; session-token=abc; garbage"),
        );

        assert!(session_tokens(&headers).is_empty());
        assert!(session_tokens(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn token_hash_depends_on_secret() {
        let token = generate_token();
        assert_eq!(token.len(), 64);

        let a = hash_token("one", &token).unwrap();
        let b = hash_token("two", &token).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, hash_token("one", &token).unwrap());
    }

    #[test]
    fn secure_sites_get_prefixed_cookies() {
        let cookie = session_cookie("tok", 60, true);
        assert!(cookie.starts_with("__Secure-showcase.session-token=tok;"));
        assert!(cookie.contains("Secure"));
        assert!(cleared_session_cookie(false).contains("Max-Age=0"));
    }
}
