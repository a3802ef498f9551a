/// Editable page copy
///
/// A flat key/value store for the texts the admin can change without a deploy
/// (About page hero, story, services). No versioning; the only rule is that
/// keys are non-empty.

use anyhow::Result;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::BTreeMap;

/// SQLite-backed settings store
#[derive(Debug, Clone)]
pub struct SettingsStorage {
    pool: SqlitePool,
}

impl SettingsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every setting, keyed and sorted by name
    pub async fn get_all(&self) -> Result<BTreeMap<String, String>> {
        let rows = sqlx::query("SELECT key, value FROM site_settings")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect())
    }

    /// The requested settings that exist; unknown keys are simply absent
    pub async fn get_many(&self, keys: &[String]) -> Result<BTreeMap<String, String>> {
        let mut settings = BTreeMap::new();
        for key in keys {
            let value = sqlx::query_scalar::<_, String>("SELECT value FROM site_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(value) = value {
                settings.insert(key.clone(), value);
            }
        }
        Ok(settings)
    }

    /// Upsert all entries in one transaction
    ///
    /// Fails without writing anything if any key is empty.
    pub async fn upsert_many(&self, entries: &BTreeMap<String, String>) -> Result<usize> {
        if let Some(bad) = entries.keys().find(|key| key.trim().is_empty()) {
            return Err(anyhow::anyhow!("Setting key must not be empty (got {:?})", bad));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO site_settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(key.trim())
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(entries.len())
    }
}
