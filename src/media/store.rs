/// Remote image storage abstraction

use crate::media::validate::ImageUpload;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Where an uploaded image ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

/// Public upload settings handed to the admin UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub upload_preset: Option<String>,
    pub folder: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload one image into `folder`
    async fn upload(&self, folder: &str, image: &ImageUpload) -> Result<StoredImage>;

    /// Delete assets by public id; returns how many were actually deleted
    async fn delete(&self, public_ids: &[String]) -> Result<usize>;

    /// Delete every asset under `folder` and the folder itself
    async fn delete_folder(&self, folder: &str) -> Result<usize>;

    /// `None` when the store has no account behind it
    fn client_config(&self) -> Option<ClientConfig>;

    /// Root folder under which project folders are created
    fn root_folder(&self) -> &str;
}

/// Folder holding the images of one project
pub fn project_folder(store: &dyn ImageStore, project_id: &str) -> String {
    format!("{}/projects/{}", store.root_folder().trim_end_matches('/'), project_id)
}

/// Best-effort removal of assets nobody will reference; failures are only logged
pub async fn discard(store: &dyn ImageStore, public_ids: &[String], reason: &str) {
    if public_ids.is_empty() {
        return;
    }

    match store.delete(public_ids).await {
        Ok(deleted) => tracing::info!("🧹 Discarded {}/{} images ({})", deleted, public_ids.len(), reason),
        Err(e) => tracing::error!(
            "❌ Failed to discard {} images ({}): {:#}. Orphans: {:?}",
            public_ids.len(),
            reason,
            e,
            public_ids
        ),
    }
}

/// Store used when no Cloudinary credentials are configured
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredImageStore;

#[async_trait]
impl ImageStore for UnconfiguredImageStore {
    async fn upload(&self, _folder: &str, image: &ImageUpload) -> Result<StoredImage> {
        Err(anyhow::anyhow!("Image storage is not configured; cannot upload '{}'", image.filename))
    }

    async fn delete(&self, public_ids: &[String]) -> Result<usize> {
        Err(anyhow::anyhow!("Image storage is not configured; cannot delete {} images", public_ids.len()))
    }

    async fn delete_folder(&self, folder: &str) -> Result<usize> {
        Err(anyhow::anyhow!("Image storage is not configured; cannot delete folder '{}'", folder))
    }

    fn client_config(&self) -> Option<ClientConfig> {
        None
    }

    fn root_folder(&self) -> &str {
        "showcase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_store_fails_every_call() {
        let store = UnconfiguredImageStore;
        let image = ImageUpload {
            filename: "a.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1],
        };

        assert!(store.upload("f", &image).await.is_err());
        assert!(store.delete(&["x".to_string()]).await.is_err());
        assert!(store.client_config().is_none());
        assert_eq!(project_folder(&store, "p1"), "showcase/projects/p1");

        // Never panics, only logs
        discard(&store, &["x".to_string()], "test").await;
    }
}
