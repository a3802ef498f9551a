/// Tag REST API endpoints

use crate::{
    api::{error::ApiError, AppState},
    auth::AdminGuard,
    tags::{RenameOutcome, Tag},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Longest accepted tag name, in characters
pub const MAX_TAG_NAME: usize = 50;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

/// Create tag routes
pub fn create_tag_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/{id}", get(get_tag).patch(rename_tag).delete(delete_tag))
}

/// GET /api/tags
/// Returns: { "tags": [{ "id": "...", "name": "...", "projectCount": 3 }] }
async fn list_tags(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tags = state.tags.list().await?;
    Ok(Json(json!({ "tags": tags })))
}

/// GET /api/tags/{id}
async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Tag>, ApiError> {
    state.tags.get(&id).await?.map(Json).ok_or(ApiError::NotFound("Tag"))
}

/// Create a tag, or return the existing one with that name
///
/// POST /api/tags
/// Body: { "name": "Kitchen" }
/// Returns 201 for a new tag, 200 when it already existed
async fn create_tag(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Json(payload): Json<TagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let name = validated_name(&payload.name)?;
    let (tag, created) = state.tags.create(name).await?;

    if created {
        tracing::info!("🏷️ {} created tag {}", admin.email, tag.name);
        Ok((StatusCode::CREATED, Json(tag)))
    } else {
        Ok((StatusCode::OK, Json(tag)))
    }
}

/// PATCH /api/tags/{id}
/// Body: { "name": "New name" }
async fn rename_tag(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TagRequest>,
) -> Result<Json<Tag>, ApiError> {
    let name = validated_name(&payload.name)?;

    match state.tags.rename(&id, name).await? {
        RenameOutcome::Renamed(tag) => {
            tracing::info!("🏷️ {} renamed tag {} to {}", admin.email, id, tag.name);
            Ok(Json(tag))
        }
        RenameOutcome::NotFound => Err(ApiError::NotFound("Tag")),
        RenameOutcome::Conflict => Err(ApiError::Conflict(format!("A tag named '{}' already exists", name))),
    }
}

/// Delete a tag; projects using it lose the tag and nothing else
///
/// DELETE /api/tags/{id}
async fn delete_tag(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.tags.delete(&id).await? {
        return Err(ApiError::NotFound("Tag"));
    }

    tracing::info!("🗑️ {} deleted tag {}", admin.email, id);
    Ok(Json(json!({ "message": "Tag deleted", "id": id })))
}

fn validated_name(raw: &str) -> Result<&str, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Tag name is required"));
    }
    if name.chars().count() > MAX_TAG_NAME {
        return Err(ApiError::bad_request(format!(
            "Tag name must be at most {} characters",
            MAX_TAG_NAME
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validated_name("  Deck ").unwrap(), "Deck");
        assert!(validated_name("   ").is_err());
        assert!(validated_name(&"x".repeat(MAX_TAG_NAME + 1)).is_err());
    }
}
