/// OAuth sign-in providers
///
/// The sign-in handlers only talk to the [`OAuthProvider`] trait; Google is the
/// one real implementation.

use crate::auth::types::OAuthProfile;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider id used in routes and the `accounts` table
    fn id(&self) -> &'static str;

    /// Where to send the browser to start a sign-in
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String>;

    /// Trade the callback `code` for the signed-in person's profile
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<OAuthProfile>;
}

/// Google OpenID Connect sign-in
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleOAuth {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn id(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String> {
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )?;
        Ok(url.to_string())
    }

    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<OAuthProfile> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(anyhow::anyhow!("Google sign-in is not configured"));
        }

        let tokens: TokenResponse = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Google token exchange failed: {}", e))?
            .json()
            .await?;

        let info: UserInfo = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&tokens.access_token)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Google userinfo request failed: {}", e))?
            .json()
            .await?;

        let email = info
            .email
            .filter(|_| info.email_verified)
            .ok_or_else(|| anyhow::anyhow!("Google account {} has no verified e-mail", info.sub))?;

        Ok(OAuthProfile {
            provider: self.id().to_string(),
            provider_account_id: info.sub,
            email,
            name: info.name,
            image: info.picture,
            access_token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token,
            expires_at: tokens
                .expires_in
                .map(|secs| chrono::Utc::now().timestamp() + secs),
            id_token: tokens.id_token,
            scope: tokens.scope,
            token_type: tokens.token_type,
        })
    }
}
