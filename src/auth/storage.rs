/// SQLite persistence for users, linked accounts, sessions and OAuth state

use crate::auth::{
    allowlist::AdminAllowlist,
    session::{generate_token, hash_token},
    types::{OAuthProfile, SessionRecord, User},
};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

/// `verification_tokens.identifier` used for OAuth state values
const OAUTH_STATE: &str = "oauth-state";
/// How long a sign-in attempt may take between redirect and callback
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// Storage for everything the sign-in flow and the admin guard read
#[derive(Debug, Clone)]
pub struct AuthStorage {
    pool: SqlitePool,
    /// Key for hashing session tokens
    session_secret: String,
}

impl AuthStorage {
    pub fn new(pool: SqlitePool, session_secret: impl Into<String>) -> Self {
        Self {
            pool,
            session_secret: session_secret.into(),
        }
    }

    pub async fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Grant or revoke admin rights. Returns false when the user does not exist.
    pub async fn set_admin(&self, user_id: &str, is_admin: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
            .bind(is_admin)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Complete a sign-in
    ///
    /// Upserts the user by e-mail, links the provider account, synchronises
    /// `is_admin` with the allowlist (granting or revoking) and opens a new
    /// session. Returns the raw cookie token together with the stored session.
    pub async fn sign_in(
        &self,
        profile: &OAuthProfile,
        allowlist: &AdminAllowlist,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<(String, SessionRecord)> {
        let email = profile.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(anyhow::anyhow!("OAuth profile has no e-mail address"));
        }
        let is_admin = allowlist.contains(&email);
        let expires = now
            .checked_add_signed(max_age)
            .filter(|expires| *expires > now)
            .ok_or_else(|| anyhow::anyhow!("Invalid session lifetime: {}", max_age))?;

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, (String, bool)>("SELECT id, is_admin FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&mut *tx)
            .await?;

        let user_id = match existing {
            Some((id, was_admin)) => {
                sqlx::query(
                    r#"
                    UPDATE users SET
                        name = COALESCE(?, name),
                        image = COALESCE(?, image),
                        email_verified = COALESCE(email_verified, ?),
                        is_admin = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&profile.name)
                .bind(&profile.image)
                .bind(now)
                .bind(is_admin)
                .bind(&id)
                .execute(&mut *tx)
                .await?;

                if was_admin != is_admin {
                    tracing::info!("🔐 Admin flag for {} changed by allowlist: {} -> {}", email, was_admin, is_admin);
                }
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                sqlx::query(
                    r#"
                    INSERT INTO users (id, name, email, email_verified, image, is_admin, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(&profile.name)
                .bind(&email)
                .bind(now)
                .bind(&profile.image)
                .bind(is_admin)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                tracing::info!("👤 Created user {} (admin: {})", email, is_admin);
                id
            }
        };

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, user_id, provider, provider_account_id,
                access_token, refresh_token, expires_at, id_token, scope, token_type
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(provider, provider_account_id) DO UPDATE SET
                user_id = excluded.user_id,
                access_token = excluded.access_token,
                refresh_token = COALESCE(excluded.refresh_token, accounts.refresh_token),
                expires_at = excluded.expires_at,
                id_token = excluded.id_token,
                scope = excluded.scope,
                token_type = excluded.token_type
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(&profile.provider)
        .bind(&profile.provider_account_id)
        .bind(&profile.access_token)
        .bind(&profile.refresh_token)
        .bind(profile.expires_at)
        .bind(&profile.id_token)
        .bind(&profile.scope)
        .bind(&profile.token_type)
        .execute(&mut *tx)
        .await?;

        let token = generate_token();
        let session = SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id,
            email,
            is_admin,
            expires,
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (id, session_token_hash, user_id, email, is_admin, expires)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(hash_token(&self.session_secret, &token)?)
        .bind(&session.user_id)
        .bind(&session.email)
        .bind(session.is_admin)
        .bind(session.expires)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((token, session))
    }

    /// Look up the session a cookie token refers to. Expiry is not checked here.
    pub async fn find_session(&self, token: &str) -> Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, email, is_admin, expires FROM sessions WHERE session_token_hash = ?",
        )
        .bind(hash_token(&self.session_secret, token)?)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Sign out: drop the session a cookie token refers to
    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_token_hash = ?")
            .bind(hash_token(&self.session_secret, token)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_session_by_id(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Store a single-use OAuth state value
    pub async fn issue_state(&self, now: DateTime<Utc>) -> Result<String> {
        let state = generate_token();
        sqlx::query("INSERT INTO verification_tokens (identifier, token, expires) VALUES (?, ?, ?)")
            .bind(OAUTH_STATE)
            .bind(&state)
            .bind(now + Duration::minutes(OAUTH_STATE_TTL_MINUTES))
            .execute(&self.pool)
            .await?;
        Ok(state)
    }

    /// Consume an OAuth state value. True only if it existed and had not expired.
    pub async fn consume_state(&self, state: &str, now: DateTime<Utc>) -> Result<bool> {
        let expires = sqlx::query_scalar::<_, DateTime<Utc>>(
            "DELETE FROM verification_tokens WHERE identifier = ? AND token = ? RETURNING expires",
        )
        .bind(OAUTH_STATE)
        .bind(state)
        .fetch_optional(&self.pool)
        .await?;

        Ok(matches!(expires, Some(expires) if expires > now))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db;

    pub(crate) fn profile(email: &str) -> OAuthProfile {
        OAuthProfile {
            provider: "google".to_string(),
            provider_account_id: format!("sub-{}", email),
            email: email.to_string(),
            name: Some("Test Person".to_string()),
            ..Default::default()
        }
    }

    async fn storage() -> AuthStorage {
        AuthStorage::new(db::connect_in_memory().await.unwrap(), "test-secret")
    }

    #[tokio::test]
    async fn sign_in_syncs_admin_flag_from_allowlist() {
        let storage = storage().await;
        let now = Utc::now();
        let allowlist = AdminAllowlist::from_csv("owner@example.com");

        let (_, session) = storage
            .sign_in(&profile("Owner@Example.com"), &allowlist, Duration::days(30), now)
            .await
            .unwrap();
        assert!(session.is_admin);
        assert_eq!(session.email, "owner@example.com");
        assert!(storage.user_by_id(&session.user_id).await.unwrap().unwrap().is_admin);

        // Removed from the allowlist: the next sign-in revokes the flag
        let (_, again) = storage
            .sign_in(&profile("owner@example.com"), &AdminAllowlist::default(), Duration::days(30), now)
            .await
            .unwrap();
        assert_eq!(again.user_id, session.user_id);
        assert!(!storage.user_by_id(&session.user_id).await.unwrap().unwrap().is_admin);
    }

    #[tokio::test]
    async fn sessions_are_found_by_raw_token_only() {
        let storage = storage().await;
        let now = Utc::now();
        let (token, session) = storage
            .sign_in(&profile("a@example.com"), &AdminAllowlist::default(), Duration::days(1), now)
            .await
            .unwrap();

        let found = storage.find_session(&token).await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert!(!found.is_expired(now));
        assert!(found.is_expired(now + Duration::days(2)));

        let stored_hash: String = sqlx::query_scalar("SELECT session_token_hash FROM sessions")
            .fetch_one(&storage.pool)
            .await
            .unwrap();
        assert_ne!(stored_hash, token);
        assert!(storage.find_session(&stored_hash).await.unwrap().is_none());

        assert!(storage.delete_session(&token).await.unwrap());
        assert!(storage.find_session(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oauth_state_is_single_use_and_expires() {
        let storage = storage().await;
        let now = Utc::now();

        let state = storage.issue_state(now).await.unwrap();
        assert!(storage.consume_state(&state, now).await.unwrap());
        assert!(!storage.consume_state(&state, now).await.unwrap());

        let stale = storage.issue_state(now).await.unwrap();
        assert!(!storage.consume_state(&stale, now + Duration::minutes(11)).await.unwrap());
        assert!(!storage.consume_state("made-up", now).await.unwrap());
    }

    #[tokio::test]
    async fn unusable_session_lifetimes_are_refused() {
        let storage = storage().await;
        let now = Utc::now();

        for max_age in [Duration::zero(), Duration::days(-1), Duration::days(100_000_000)] {
            let result = storage
                .sign_in(&profile("a@example.com"), &AdminAllowlist::default(), max_age, now)
                .await;
            assert!(result.is_err(), "{}", max_age);
        }

        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&storage.pool)
            .await
            .unwrap();
        assert_eq!(sessions, 0);
    }

    #[tokio::test]
    async fn set_admin_reports_missing_users() {
        let storage = storage().await;
        assert!(!storage.set_admin("ghost", true).await.unwrap());
        assert!(storage.user_by_email("ghost@example.com").await.unwrap().is_none());
    }
}
