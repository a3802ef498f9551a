/// Cloudinary image storage client
///
/// Uploads go through the signed upload API; deletions use the admin API with
/// basic auth. Signatures are SHA-256, so the Cloudinary account must have
/// SHA-256 signing enabled.

use crate::{
    config::CloudinaryConfig,
    media::{
        store::{ClientConfig, ImageStore, StoredImage},
        validate::ImageUpload,
    },
};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
/// Admin API limit for `public_ids[]` per request
const DELETE_BATCH: usize = 100;

#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    deleted: HashMap<String, String>,
    /// Present when more matching assets remain
    next_cursor: Option<String>,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", API_BASE, self.config.cloud_name, path)
    }

    /// Delete everything matching `prefix`, following the admin API cursor
    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut deleted = 0;
        let mut cursor: Option<String> = None;
        loop {
            let mut query = vec![("prefix", prefix.to_string())];
            if let Some(next) = cursor.take() {
                query.push(("next_cursor", next));
            }

            let response: DeleteResponse = self
                .client
                .delete(self.endpoint("resources/image/upload"))
                .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
                .query(&query)
                .send()
                .await?
                .error_for_status()
                .map_err(|e| anyhow::anyhow!("Cloudinary prefix delete failed: {}", e))?
                .json()
                .await?;

            deleted += count_deleted(&response.deleted);
            match response.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl ImageStore for CloudinaryClient {
    async fn upload(&self, folder: &str, image: &ImageUpload) -> Result<StoredImage> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        params.insert("timestamp", timestamp.clone());
        let signature = sign(&params, &self.config.api_secret);

        let file = Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let uploaded: UploadResponse = self
            .client
            .post(self.endpoint("image/upload"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Cloudinary upload of '{}' failed: {}", image.filename, e))?
            .json()
            .await?;

        tracing::debug!("☁️ Uploaded {} as {}", image.filename, uploaded.public_id);
        Ok(StoredImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, public_ids: &[String]) -> Result<usize> {
        let mut deleted = 0;
        for chunk in public_ids.chunks(DELETE_BATCH) {
            let query: Vec<(&str, &str)> = chunk.iter().map(|id| ("public_ids[]", id.as_str())).collect();
            let response: DeleteResponse = self
                .client
                .delete(self.endpoint("resources/image/upload"))
                .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
                .query(&query)
                .send()
                .await?
                .error_for_status()
                .map_err(|e| anyhow::anyhow!("Cloudinary delete failed: {}", e))?
                .json()
                .await?;
            deleted += count_deleted(&response.deleted);
        }
        Ok(deleted)
    }

    async fn delete_folder(&self, folder: &str) -> Result<usize> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let deleted = self.delete_by_prefix(&prefix).await?;

        // The folder itself; missing folders are fine
        let response = self
            .client
            .delete(self.endpoint(&format!("folders/{}", folder.trim_end_matches('/'))))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await?;
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            tracing::warn!("⚠️ Could not remove Cloudinary folder {}: {}", folder, response.status());
        }

        Ok(deleted)
    }

    fn client_config(&self) -> Option<ClientConfig> {
        Some(ClientConfig {
            cloud_name: self.config.cloud_name.clone(),
            api_key: self.config.api_key.clone(),
            upload_preset: self.config.upload_preset.clone(),
            folder: self.config.root_folder.clone(),
        })
    }

    fn root_folder(&self) -> &str {
        &self.config.root_folder
    }
}

/// Request signature: sorted `key=value` pairs joined by `&`, secret appended, SHA-256 hex
fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let payload = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn count_deleted(results: &HashMap<String, String>) -> usize {
    results.values().filter(|status| status.as_str() == "deleted").count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_params_and_skips_empty_values() {
        let mut a = BTreeMap::new();
        a.insert("timestamp", "1700000000".to_string());
        a.insert("folder", "showcase/projects/p1".to_string());
        a.insert("tags", String::new());

        let mut b = BTreeMap::new();
        b.insert("folder", "showcase/projects/p1".to_string());
        b.insert("timestamp", "1700000000".to_string());

        assert_eq!(sign(&a, "secret"), sign(&b, "secret"));
        assert_ne!(sign(&a, "secret"), sign(&a, "other"));

        let mut hasher = Sha256::new();
        hasher.update(b"folder=showcase/projects/p1&timestamp=1700000000secret");
        assert_eq!(sign(&a, "secret"), hex::encode(hasher.finalize()));
    }

    #[test]
    fn only_deleted_results_count() {
        let mut results = HashMap::new();
        results.insert("a".to_string(), "deleted".to_string());
        results.insert("b".to_string(), "not_found".to_string());
        assert_eq!(count_deleted(&results), 1);
    }

    #[test]
    fn client_config_exposes_no_secret() {
        let client = CloudinaryClient::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            upload_preset: Some("preset".to_string()),
            root_folder: "site".to_string(),
        });

        let config = client.client_config().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert_eq!(client.endpoint("image/upload"), "https://api.cloudinary.com/v1_1/demo/image/upload");
    }
}
