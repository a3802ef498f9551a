/// SQLite persistence for tags and the tag resolution helper

use crate::tags::types::{Tag, TagSummary};
use anyhow::Result;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, SqliteConnection};
use std::collections::HashSet;
use uuid::Uuid;

/// Result of renaming a tag
#[derive(Debug)]
pub enum RenameOutcome {
    Renamed(Tag),
    NotFound,
    /// Another tag already uses the name (case-insensitively)
    Conflict,
}

#[derive(Debug, Clone)]
pub struct TagStorage {
    pool: SqlitePool,
}

impl TagStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All tags with the number of projects using each, sorted by name
    pub async fn list(&self) -> Result<Vec<TagSummary>> {
        let tags = sqlx::query_as::<_, TagSummary>(
            r#"
            SELECT t.id, t.name, COUNT(pt.project_id) AS project_count
            FROM tags t
            LEFT JOIN project_tags pt ON pt.tag_id = t.id
            GROUP BY t.id, t.name
            ORDER BY t.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// Create a tag, or return the existing one with the same name
    ///
    /// The flag is true when a new row was inserted.
    pub async fn create(&self, name: &str) -> Result<(Tag, bool)> {
        let mut conn = self.pool.acquire().await?;
        let (tag, created) = insert_or_get(&mut conn, name.trim()).await?;
        if created {
            tracing::info!("🏷️ Created tag: {}", tag.name);
        }
        Ok((tag, created))
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<RenameOutcome> {
        let name = name.trim();
        let mut conn = self.pool.acquire().await?;

        if let Some(other) = find_by_name(&mut conn, name).await? {
            if other.id != id {
                return Ok(RenameOutcome::Conflict);
            }
        }

        let result = match sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&mut *conn)
            .await
        {
            Ok(result) => result,
            // Another request took the name after the check above
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Ok(RenameOutcome::Conflict),
            Err(e) => return Err(e.into()),
        };

        if result.rows_affected() == 0 {
            return Ok(RenameOutcome::NotFound);
        }

        Ok(RenameOutcome::Renamed(Tag {
            id: id.to_string(),
            name: name.to_string(),
        }))
    }

    /// Delete a tag. Its project links go with it; the projects stay.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Trim, drop empty entries and dedupe case-insensitively, keeping the first spelling
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Map tag names to tag ids, creating the tags that do not exist yet
///
/// Ids come back in first-occurrence order of the normalized names. Takes a
/// connection so callers can run it inside their own transaction.
pub async fn resolve_tag_ids(conn: &mut SqliteConnection, names: &[String]) -> Result<Vec<String>> {
    let mut ids = Vec::new();

    for name in normalize_tag_names(names) {
        let tag = match find_by_name(conn, &name).await? {
            Some(tag) => tag,
            None => {
                let (tag, created) = insert_or_get(conn, &name).await?;
                if created {
                    tracing::debug!("🏷️ Created tag on assignment: {}", tag.name);
                }
                tag
            }
        };

        // Two spellings that SQLite folds together but Rust does not
        if !ids.contains(&tag.id) {
            ids.push(tag.id);
        }
    }

    Ok(ids)
}

async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = ? COLLATE NOCASE")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(tag)
}

/// Insert a tag unless one with the same name (any case) exists; true when inserted
///
/// Concurrent creators of the same name both succeed and get the same row.
async fn insert_or_get(conn: &mut SqliteConnection, name: &str) -> Result<(Tag, bool)> {
    let id = Uuid::new_v4().to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO tags (id, name, created_at) VALUES (?, ?, ?)
        ON CONFLICT(name) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        return Ok((
            Tag {
                id,
                name: name.to_string(),
            },
            true,
        ));
    }

    let existing = find_by_name(conn, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Tag '{}' conflicted on insert but cannot be found", name))?;
    Ok((existing, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalization_keeps_first_spelling() {
        let normalized = normalize_tag_names(&names(&["  Kitchen ", "kitchen", "", "Bath", "KITCHEN", "   "]));
        assert_eq!(normalized, names(&["Kitchen", "Bath"]));
    }

    #[tokio::test]
    async fn resolve_reuses_existing_tags_case_insensitively() {
        let storage = TagStorage::new(db::connect_in_memory().await.unwrap());
        let (existing, created) = storage.create("Outdoor").await.unwrap();
        assert!(created);

        let mut conn = storage.pool.acquire().await.unwrap();
        let ids = resolve_tag_ids(&mut conn, &names(&["deck", "OUTDOOR", "Deck", "patio"]))
            .await
            .unwrap();
        drop(conn);
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[1], existing.id);

        let all = storage.list().await.unwrap();
        let listed: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(listed, vec!["deck", "Outdoor", "patio"]);
    }

    #[tokio::test]
    async fn create_returns_existing_tag() {
        let storage = TagStorage::new(db::connect_in_memory().await.unwrap());
        let (first, _) = storage.create("Remodel").await.unwrap();
        let (second, created) = storage.create(" remodel ").await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn insert_after_a_concurrent_create_returns_that_tag() {
        let storage = TagStorage::new(db::connect_in_memory().await.unwrap());
        let mut conn = storage.pool.acquire().await.unwrap();

        // The name was taken between another request's lookup and its insert
        let (winner, created) = insert_or_get(&mut conn, "Siding").await.unwrap();
        assert!(created);
        let (loser, created) = insert_or_get(&mut conn, "SIDING").await.unwrap();
        assert!(!created);
        assert_eq!(loser, winner);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn rename_detects_conflicts_and_missing_tags() {
        let storage = TagStorage::new(db::connect_in_memory().await.unwrap());
        let (a, _) = storage.create("Alpha").await.unwrap();
        storage.create("Beta").await.unwrap();

        assert!(matches!(storage.rename(&a.id, "beta").await.unwrap(), RenameOutcome::Conflict));
        assert!(matches!(storage.rename("missing", "Gamma").await.unwrap(), RenameOutcome::NotFound));
        // Changing only the case of its own name is allowed
        match storage.rename(&a.id, "ALPHA").await.unwrap() {
            RenameOutcome::Renamed(tag) => assert_eq!(tag.name, "ALPHA"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
