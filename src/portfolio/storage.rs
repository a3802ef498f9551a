/// SQLite persistence for portfolio projects, their images and tag links
///
/// Multi-row writes run in one transaction. Remote assets are never touched
/// here; callers receive the public ids that became unreferenced and clean
/// them up after the commit.

use crate::{
    portfolio::types::{NewImage, NewProject, PatchOutcome, Project, ProjectImage, ProjectPatch, ProjectRow},
    tags::{resolve_tag_ids, Tag},
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, SqliteConnection};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ProjectStorage {
    pool: SqlitePool,
}

impl ProjectStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Gallery order: `display_order` ascending, newest first within the same slot
    pub async fn list(&self, featured_only: bool) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT * FROM projects
            WHERE (? = 0 OR featured = 1)
            ORDER BY display_order ASC, created_at DESC
            "#,
        )
        .bind(featured_only)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            projects.push(hydrate(&mut conn, row).await?);
        }
        Ok(projects)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Project>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Insert a project with its tags and images; it lands at the end of the gallery
    pub async fn create(&self, new: NewProject) -> Result<Project> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let next_order: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(display_order), -1) + 1 FROM projects")
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO projects (id, title, description, featured, display_order, cloudinary_folder, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.id)
        .bind(new.title.trim())
        .bind(new.description.trim())
        .bind(new.featured)
        .bind(next_order)
        .bind(&new.cloudinary_folder)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        set_tags(&mut tx, &new.id, &new.tag_names).await?;
        for (position, image) in new.images.iter().enumerate() {
            insert_image(&mut tx, &new.id, image, position as i64, now).await?;
        }

        let project = fetch(&mut tx, &new.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Project {} vanished inside its own transaction", new.id))?;
        tx.commit().await?;

        tracing::info!("📁 Created project {} ({}) with {} images", project.id, project.title, project.images.len());
        Ok(project)
    }

    /// Apply a partial update. `Ok(None)` when the project does not exist.
    pub async fn update(&self, id: &str, patch: ProjectPatch) -> Result<Option<PatchOutcome>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE projects SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                featured = COALESCE(?, featured),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.title.as_deref().map(str::trim))
        .bind(patch.description.as_deref().map(str::trim))
        .bind(patch.featured)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(names) = &patch.tag_names {
            sqlx::query("DELETE FROM project_tags WHERE project_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            set_tags(&mut tx, id, names).await?;
        }

        let mut released = Vec::new();

        for image_id in &patch.remove_image_ids {
            let public_id = sqlx::query_scalar::<_, String>(
                "DELETE FROM project_images WHERE id = ? AND project_id = ? RETURNING public_id",
            )
            .bind(image_id)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            match public_id {
                Some(public_id) => released.push(public_id),
                None => tracing::debug!("🔍 Image {} is not part of project {}, skipping removal", image_id, id),
            }
        }

        for (image_id, image) in &patch.replace_images {
            let old_public_id = sqlx::query_scalar::<_, String>(
                "SELECT public_id FROM project_images WHERE id = ? AND project_id = ?",
            )
            .bind(image_id)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(old_public_id) = old_public_id else {
                released.push(image.stored.public_id.clone());
                continue;
            };

            sqlx::query("UPDATE project_images SET url = ?, public_id = ?, alt = COALESCE(?, alt) WHERE id = ?")
                .bind(&image.stored.url)
                .bind(&image.stored.public_id)
                .bind(&image.alt)
                .bind(image_id)
                .execute(&mut *tx)
                .await?;
            released.push(old_public_id);
        }

        if !patch.add_images.is_empty() {
            let mut position: i64 =
                sqlx::query_scalar("SELECT COALESCE(MAX(position), -1) + 1 FROM project_images WHERE project_id = ?")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            for image in &patch.add_images {
                insert_image(&mut tx, id, image, position, now).await?;
                position += 1;
            }
        }

        renumber_images(&mut tx, id, patch.image_order.as_deref()).await?;

        let project = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Project {} vanished inside its own transaction", id))?;
        tx.commit().await?;

        tracing::info!("✏️ Updated project {} ({} assets released)", id, released.len());
        Ok(Some(PatchOutcome {
            project,
            released_public_ids: released,
        }))
    }

    /// Delete a project; images and tag links cascade
    ///
    /// Returns the public ids of its images and its image folder, or `None`
    /// when the project does not exist.
    pub async fn delete(&self, id: &str) -> Result<Option<(Vec<String>, Option<String>)>> {
        let mut tx = self.pool.begin().await?;

        let folder = sqlx::query_scalar::<_, Option<String>>("SELECT cloudinary_folder FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(folder) = folder else {
            return Ok(None);
        };

        let public_ids = sqlx::query_scalar::<_, String>(
            "SELECT public_id FROM project_images WHERE project_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("🗑️ Deleted project {} ({} images)", id, public_ids.len());
        Ok(Some((public_ids, folder)))
    }

    /// Put projects in the given order
    ///
    /// Known ids get consecutive slots in list order; unknown ids are ignored.
    /// Projects left out of the list follow, keeping their current relative
    /// order. Returns how many listed projects were placed.
    pub async fn reorder(&self, ids: &[String]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let current =
            sqlx::query_scalar::<_, String>("SELECT id FROM projects ORDER BY display_order ASC, created_at DESC")
                .fetch_all(&mut *tx)
                .await?;

        let mut ordered: Vec<&String> = Vec::with_capacity(current.len());
        for id in ids {
            if current.contains(id) && !ordered.contains(&id) {
                ordered.push(id);
            } else if !current.contains(id) {
                tracing::debug!("🔍 Reorder skipped unknown project {}", id);
            }
        }
        let placed = ordered.len();
        for id in &current {
            if !ordered.contains(&id) {
                ordered.push(id);
            }
        }

        for (slot, id) in ordered.into_iter().enumerate() {
            sqlx::query("UPDATE projects SET display_order = ? WHERE id = ?")
                .bind(slot as i64)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(placed)
    }

    /// The subset of `public_ids` still attached to some project
    pub async fn referenced_public_ids(&self, public_ids: &[String]) -> Result<HashSet<String>> {
        let mut referenced = HashSet::new();
        for public_id in public_ids {
            let used: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM project_images WHERE public_id = ?)")
                .bind(public_id)
                .fetch_one(&self.pool)
                .await?;
            if used {
                referenced.insert(public_id.clone());
            }
        }
        Ok(referenced)
    }
}

async fn fetch(conn: &mut SqliteConnection, id: &str) -> Result<Option<Project>> {
    let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, row).await?)),
        None => Ok(None),
    }
}

async fn hydrate(conn: &mut SqliteConnection, row: ProjectRow) -> Result<Project> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name FROM tags t
        JOIN project_tags pt ON pt.tag_id = t.id
        WHERE pt.project_id = ?
        ORDER BY t.name COLLATE NOCASE
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let images = sqlx::query_as::<_, ProjectImage>(
        r#"
        SELECT id, project_id, url, public_id, alt, position FROM project_images
        WHERE project_id = ?
        ORDER BY position, created_at
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(row.with_relations(tags, images))
}

async fn set_tags(conn: &mut SqliteConnection, project_id: &str, names: &[String]) -> Result<()> {
    for tag_id in resolve_tag_ids(conn, names).await? {
        sqlx::query("INSERT OR IGNORE INTO project_tags (project_id, tag_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(&tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_image(
    conn: &mut SqliteConnection,
    project_id: &str,
    image: &NewImage,
    position: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO project_images (id, project_id, url, public_id, alt, position, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(project_id)
    .bind(&image.stored.url)
    .bind(&image.stored.public_id)
    .bind(&image.alt)
    .bind(position)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Compact image positions to 0..n, honouring `order` first when given
async fn renumber_images(conn: &mut SqliteConnection, project_id: &str, order: Option<&[String]>) -> Result<()> {
    let current = sqlx::query_scalar::<_, String>(
        "SELECT id FROM project_images WHERE project_id = ? ORDER BY position, created_at",
    )
    .bind(project_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut ordered: Vec<&String> = Vec::with_capacity(current.len());
    if let Some(order) = order {
        for id in order {
            if current.contains(id) && !ordered.contains(&id) {
                ordered.push(id);
            }
        }
    }
    for id in &current {
        if !ordered.contains(&id) {
            ordered.push(id);
        }
    }

    for (position, id) in ordered.into_iter().enumerate() {
        sqlx::query("UPDATE project_images SET position = ? WHERE id = ?")
            .bind(position as i64)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, media::StoredImage, tags::TagStorage};

    fn image(public_id: &str) -> NewImage {
        NewImage {
            stored: StoredImage {
                url: format!("https://img.example/{}.jpg", public_id),
                public_id: public_id.to_string(),
            },
            alt: None,
        }
    }

    fn new_project(title: &str, tags: &[&str], images: &[&str]) -> NewProject {
        NewProject {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: "A project".to_string(),
            featured: false,
            cloudinary_folder: Some(format!("site/projects/{}", title)),
            tag_names: tags.iter().map(|t| t.to_string()).collect(),
            images: images.iter().map(|i| image(i)).collect(),
        }
    }

    async fn storage() -> (ProjectStorage, SqlitePool) {
        let pool = db::connect_in_memory().await.unwrap();
        (ProjectStorage::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn create_attaches_tags_and_images_in_order() {
        let (storage, _) = storage().await;
        let project = storage
            .create(new_project("Kitchen", &["Remodel", "remodel", "Interior"], &["a", "b"]))
            .await
            .unwrap();

        assert_eq!(project.title, "Kitchen");
        let tag_names: Vec<&str> = project.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["Interior", "Remodel"]);
        let public_ids: Vec<&str> = project.images.iter().map(|i| i.public_id.as_str()).collect();
        assert_eq!(public_ids, vec!["a", "b"]);
        assert_eq!(project.display_order, 0);

        let second = storage.create(new_project("Deck", &[], &[])).await.unwrap();
        assert_eq!(second.display_order, 1);
    }

    #[tokio::test]
    async fn update_removes_replaces_adds_and_reorders_images() {
        let (storage, _) = storage().await;
        let project = storage.create(new_project("Bath", &["Tile"], &["a", "b", "c"])).await.unwrap();
        let ids: Vec<String> = project.images.iter().map(|i| i.id.clone()).collect();

        let outcome = storage
            .update(
                &project.id,
                ProjectPatch {
                    title: Some("  Master Bath ".to_string()),
                    tag_names: Some(vec!["Stone".to_string()]),
                    remove_image_ids: vec![ids[0].clone(), "not-mine".to_string()],
                    replace_images: vec![(ids[1].clone(), image("b2")), ("gone".to_string(), image("z"))],
                    add_images: vec![image("d")],
                    image_order: Some(vec![ids[2].clone()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let project = outcome.project;
        assert_eq!(project.title, "Master Bath");
        assert_eq!(project.description, "A project");
        assert_eq!(project.tags.len(), 1);
        assert_eq!(project.tags[0].name, "Stone");

        let public_ids: Vec<&str> = project.images.iter().map(|i| i.public_id.as_str()).collect();
        assert_eq!(public_ids, vec!["c", "b2", "d"]);
        let positions: Vec<i64> = project.images.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        let mut released = outcome.released_public_ids;
        released.sort();
        assert_eq!(released, vec!["a", "b", "z"]);
    }

    #[tokio::test]
    async fn update_of_missing_project_is_none() {
        let (storage, _) = storage().await;
        assert!(storage.update("missing", ProjectPatch::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cascades_and_reports_assets() {
        let (storage, pool) = storage().await;
        let project = storage.create(new_project("Roof", &["Exterior"], &["r1", "r2"])).await.unwrap();

        let (public_ids, folder) = storage.delete(&project.id).await.unwrap().unwrap();
        assert_eq!(public_ids, vec!["r1", "r2"]);
        assert_eq!(folder.as_deref(), Some("site/projects/Roof"));
        assert!(storage.get(&project.id).await.unwrap().is_none());
        assert!(storage.delete(&project.id).await.unwrap().is_none());

        let leftovers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_images")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(leftovers, 0);
        // The tag itself survives
        assert_eq!(TagStorage::new(pool).list().await.unwrap()[0].project_count, 0);
    }

    #[tokio::test]
    async fn deleting_a_tag_keeps_its_projects() {
        let (storage, pool) = storage().await;
        let a = storage.create(new_project("A", &["Shared"], &[])).await.unwrap();
        let b = storage.create(new_project("B", &["Shared", "Other"], &[])).await.unwrap();

        let tags = TagStorage::new(pool);
        let shared = a.tags[0].clone();
        assert!(tags.delete(&shared.id).await.unwrap());

        let a = storage.get(&a.id).await.unwrap().unwrap();
        let b = storage.get(&b.id).await.unwrap().unwrap();
        assert!(a.tags.is_empty());
        assert_eq!(b.tags.len(), 1);
        assert_eq!(b.tags[0].name, "Other");
    }

    #[tokio::test]
    async fn reorder_ignores_unknown_ids() {
        let (storage, _) = storage().await;
        let a = storage.create(new_project("A", &[], &[])).await.unwrap();
        let b = storage.create(new_project("B", &[], &[])).await.unwrap();
        let c = storage.create(new_project("C", &[], &[])).await.unwrap();

        let moved = storage
            .reorder(&[c.id.clone(), "ghost".to_string(), a.id.clone(), c.id.clone()])
            .await
            .unwrap();
        assert_eq!(moved, 2);

        let titles: Vec<String> = storage.list(false).await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);

        // Unlisted projects keep their relative order behind the listed one
        let d = storage.create(new_project("D", &[], &[])).await.unwrap();
        assert_eq!(storage.reorder(&[b.id.clone()]).await.unwrap(), 1);
        let titles: Vec<String> = storage.list(false).await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["B", "C", "A", "D"]);
        assert_eq!(storage.get(&d.id).await.unwrap().unwrap().display_order, 3);
    }

    #[tokio::test]
    async fn featured_filter_and_reference_lookup() {
        let (storage, _) = storage().await;
        let mut featured = new_project("Featured", &[], &["f1"]);
        featured.featured = true;
        storage.create(featured).await.unwrap();
        storage.create(new_project("Plain", &[], &["p1"])).await.unwrap();

        let listed = storage.list(true).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Featured");

        let referenced = storage
            .referenced_public_ids(&["f1".to_string(), "orphan".to_string()])
            .await
            .unwrap();
        assert!(referenced.contains("f1"));
        assert!(!referenced.contains("orphan"));
    }
}
