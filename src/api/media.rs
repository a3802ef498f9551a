/// Cloudinary maintenance endpoints for the admin UI

use crate::{
    api::{error::ApiError, AppState},
    auth::AdminGuard,
    media::ClientConfig,
};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Body accepted by the delete and cleanup endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdsRequest {
    #[serde(default)]
    pub public_ids: Vec<String>,
    pub public_id: Option<String>,
}

impl PublicIdsRequest {
    /// All requested ids, trimmed, without empties or duplicates
    fn into_ids(self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.public_ids.into_iter().chain(self.public_id) {
            let id = id.trim().to_string();
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Create Cloudinary maintenance routes
pub fn create_media_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cloudinary-config", get(cloudinary_config))
        .route("/api/cloudinary-delete", post(cloudinary_delete))
        .route("/api/cloudinary-cleanup", post(cloudinary_cleanup))
}

/// GET /api/cloudinary-config
/// Returns: { "cloudName": "...", "apiKey": "...", "uploadPreset": "...", "folder": "..." }
async fn cloudinary_config(
    AdminGuard(_admin): AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<ClientConfig>, ApiError> {
    state
        .images
        .client_config()
        .map(Json)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Cloudinary is not configured")))
}

/// Delete remote images by public id
///
/// POST /api/cloudinary-delete
/// Body: { "publicIds": ["..."] } or { "publicId": "..." }
/// Returns: { "deleted": 1 }
async fn cloudinary_delete(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Json(payload): Json<PublicIdsRequest>,
) -> Result<Json<Value>, ApiError> {
    let ids = payload.into_ids();
    if ids.is_empty() {
        return Err(ApiError::bad_request("No public ids provided"));
    }

    let deleted = state.images.delete(&ids).await?;
    tracing::info!("🗑️ {} deleted {}/{} remote images", admin.email, deleted, ids.len());
    Ok(Json(json!({ "deleted": deleted })))
}

/// Delete uploads that no project references
///
/// Used when the admin UI uploaded files but the form was abandoned. Ids still
/// attached to a project are skipped.
///
/// POST /api/cloudinary-cleanup
/// Body: { "publicIds": ["..."] }
/// Returns: { "deleted": ["..."], "skipped": ["..."] }
async fn cloudinary_cleanup(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Json(payload): Json<PublicIdsRequest>,
) -> Result<Json<Value>, ApiError> {
    let ids = payload.into_ids();
    if ids.is_empty() {
        return Err(ApiError::bad_request("No public ids provided"));
    }

    let referenced = state.projects.referenced_public_ids(&ids).await?;
    let (skipped, orphans): (Vec<String>, Vec<String>) = ids.into_iter().partition(|id| referenced.contains(id));

    if !orphans.is_empty() {
        state.images.delete(&orphans).await?;
    }

    tracing::info!(
        "🧹 {} cleaned up {} orphaned images ({} still in use)",
        admin.email,
        orphans.len(),
        skipped.len()
    );
    Ok(Json(json!({ "deleted": orphans, "skipped": skipped })))
}
