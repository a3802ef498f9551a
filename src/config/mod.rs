/// Configuration management for the showcase backend
///
/// Handles server binding, database location, sign-in/allowlist settings and
/// optional Cloudinary credentials. Everything is read from environment
/// variables so the same binary runs locally and in containers.

use serde::{Deserialize, Serialize};

/// Session lifetime used when `SESSION_MAX_AGE_DAYS` is unset or unusable
pub const DEFAULT_SESSION_AGE_DAYS: i64 = 30;
/// Longest accepted session lifetime (ten years)
pub const MAX_SESSION_AGE_DAYS: i64 = 3650;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Sign-in and admin allowlist configuration
    pub auth: AuthConfig,
    /// Image storage credentials, absent when any required value is missing
    pub cloudinary: Option<CloudinaryConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
    /// Externally visible base URL, used for OAuth redirects and cookie security
    pub public_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string (e.g., "sqlite://data/showcase.db")
    pub url: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Comma separated e-mail addresses that receive admin rights on sign-in
    pub admin_emails: String,
    /// Key used to hash session tokens before they are persisted
    pub session_secret: String,
    /// Lifetime of a database session, 1..=MAX_SESSION_AGE_DAYS
    pub session_max_age_days: i64,
    pub google_client_id: String,
    pub google_client_secret: String,
}

/// Cloudinary account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Unsigned preset handed to the admin UI, if one is configured
    pub upload_preset: Option<String>,
    /// Root folder every project folder is created under
    pub root_folder: String,
}

impl Config {
    /// Whether cookies must carry the `Secure` attribute and `__Secure-` prefix
    pub fn secure_cookies(&self) -> bool {
        self.server.public_url.starts_with("https://")
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("SHOWCASE_HOST", "0.0.0.0"),
                port: env_or("SHOWCASE_PORT", "3000").parse().unwrap_or(3000),
                public_url: env_or("SHOWCASE_PUBLIC_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "sqlite://data/showcase.db"),
            },
            auth: AuthConfig {
                admin_emails: env_or("ADMIN_EMAILS", ""),
                session_secret: env_or("SESSION_SECRET", ""),
                session_max_age_days: parse_session_max_age(&env_or("SESSION_MAX_AGE_DAYS", "")),
                google_client_id: env_or("GOOGLE_CLIENT_ID", ""),
                google_client_secret: env_or("GOOGLE_CLIENT_SECRET", ""),
            },
            cloudinary: CloudinaryConfig::from_env(),
        }
    }
}

impl CloudinaryConfig {
    /// Read credentials from the environment; `None` unless all three secrets are set
    pub fn from_env() -> Option<Self> {
        let cloud_name = non_empty_env("CLOUDINARY_CLOUD_NAME")?;
        let api_key = non_empty_env("CLOUDINARY_API_KEY")?;
        let api_secret = non_empty_env("CLOUDINARY_API_SECRET")?;

        Some(Self {
            cloud_name,
            api_key,
            api_secret,
            upload_preset: non_empty_env("CLOUDINARY_UPLOAD_PRESET"),
            root_folder: env_or("CLOUDINARY_FOLDER", "showcase"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Session lifetime in days; anything outside 1..=MAX_SESSION_AGE_DAYS falls back to the default
fn parse_session_max_age(raw: &str) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(days) if (1..=MAX_SESSION_AGE_DAYS).contains(&days) => days,
        Ok(days) => {
            tracing::warn!(
                "⚠️ SESSION_MAX_AGE_DAYS={} is out of range, using {}",
                days,
                DEFAULT_SESSION_AGE_DAYS
            );
            DEFAULT_SESSION_AGE_DAYS
        }
        Err(_) => DEFAULT_SESSION_AGE_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_age_accepts_sane_values() {
        assert_eq!(parse_session_max_age("7"), 7);
        assert_eq!(parse_session_max_age(" 3650 "), MAX_SESSION_AGE_DAYS);
    }

    #[test]
    fn session_age_falls_back_on_bad_values() {
        for raw in ["", "abc", "0", "-5", "3651", "100000000", "1000000000000", "9223372036854775807"] {
            assert_eq!(parse_session_max_age(raw), DEFAULT_SESSION_AGE_DAYS, "{:?}", raw);
        }
    }
}
