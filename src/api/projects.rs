/// Portfolio project REST API endpoints
///
/// Public reads, admin-only writes. Image files are validated before anything
/// is uploaded, and uploads are rolled back (best effort) when the database
/// write that should reference them fails.

use crate::{
    api::{
        error::ApiError,
        form::{read_project_form, MAX_FORM_BYTES},
        AppState,
    },
    auth::AdminGuard,
    media::{discard, project_folder, validate_all, ImageStore, ImageUpload},
    portfolio::{NewImage, NewProject, Project, ProjectPatch},
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only featured projects (home page)
    pub featured: Option<bool>,
}

/// Request body for gallery reordering
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}

/// Create project routes
pub fn create_project_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/order", patch(reorder_projects))
        .route(
            "/api/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
}

/// List projects in gallery order
///
/// GET /api/projects[?featured=true]
/// Returns: { "projects": [...] }
async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let projects = state.projects.list(query.featured.unwrap_or(false)).await?;
    Ok(Json(json!({ "projects": projects })))
}

/// GET /api/projects/{id}
async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    state
        .projects
        .get(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Project"))
}

/// Create a project
///
/// POST /api/projects (multipart)
/// Fields: title, description, featured, tags, alt, images (files)
async fn create_project(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let form = read_project_form(multipart).await?;

    let title = form.title.as_deref().map(str::trim).unwrap_or_default().to_string();
    if title.is_empty() {
        tracing::warn!("❌ Project creation without a title by {}", admin.email);
        return Err(ApiError::bad_request("Title is required"));
    }
    validate_all(&form.images).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let id = Uuid::new_v4().to_string();
    let folder = project_folder(state.images.as_ref(), &id);
    let uploaded = upload_all(state.images.as_ref(), &folder, &form.images).await?;
    let uploaded_ids: Vec<String> = uploaded.iter().map(|image| image.stored.public_id.clone()).collect();

    let new = NewProject {
        id,
        title,
        description: form.description.unwrap_or_default(),
        featured: form.featured.unwrap_or(false),
        cloudinary_folder: Some(folder),
        tag_names: form.tags.unwrap_or_default(),
        images: uploaded
            .into_iter()
            .map(|image| NewImage {
                alt: form.alt.clone(),
                ..image
            })
            .collect(),
    };

    match state.projects.create(new).await {
        Ok(project) => {
            tracing::info!("🔥 {} created project {} ({})", admin.email, project.id, project.title);
            Ok((StatusCode::CREATED, Json(project)))
        }
        Err(e) => {
            discard(state.images.as_ref(), &uploaded_ids, "project insert failed").await;
            Err(ApiError::Internal(e))
        }
    }
}

/// Update a project
///
/// PATCH /api/projects/{id} (multipart)
/// Fields: title, description, featured, tags, alt, removeImageIds, imageOrder,
/// images (new files), replace:{imageId} (replacement files)
async fn update_project(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Project>, ApiError> {
    let form = read_project_form(multipart).await?;

    if form.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
        return Err(ApiError::bad_request("Title must not be empty"));
    }
    validate_all(form.all_uploads()).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let existing = state.projects.get(&id).await?.ok_or(ApiError::NotFound("Project"))?;
    if let Some((unknown, _)) = form
        .replacements
        .iter()
        .find(|(image_id, _)| !existing.images.iter().any(|image| &image.id == image_id))
    {
        return Err(ApiError::bad_request(format!("Image {} is not part of this project", unknown)));
    }

    let folder = existing
        .cloudinary_folder
        .clone()
        .unwrap_or_else(|| project_folder(state.images.as_ref(), &id));

    let added = upload_all(state.images.as_ref(), &folder, &form.images).await?;
    let mut uploaded_ids: Vec<String> = added.iter().map(|image| image.stored.public_id.clone()).collect();

    let mut replaced = Vec::with_capacity(form.replacements.len());
    for (image_id, upload) in &form.replacements {
        match state.images.upload(&folder, upload).await {
            Ok(stored) => {
                uploaded_ids.push(stored.public_id.clone());
                replaced.push((image_id.clone(), NewImage { stored, alt: form.alt.clone() }));
            }
            Err(e) => {
                discard(state.images.as_ref(), &uploaded_ids, "replacement upload failed").await;
                return Err(ApiError::Internal(e));
            }
        }
    }

    let patch = ProjectPatch {
        title: form.title,
        description: form.description,
        featured: form.featured,
        tag_names: form.tags,
        remove_image_ids: form.remove_image_ids,
        add_images: added
            .into_iter()
            .map(|image| NewImage {
                alt: form.alt.clone(),
                ..image
            })
            .collect(),
        replace_images: replaced,
        image_order: form.image_order,
    };

    match state.projects.update(&id, patch).await {
        Ok(Some(outcome)) => {
            discard(state.images.as_ref(), &outcome.released_public_ids, "images removed or replaced").await;
            tracing::info!("🔥 {} updated project {}", admin.email, id);
            Ok(Json(outcome.project))
        }
        Ok(None) => {
            discard(state.images.as_ref(), &uploaded_ids, "project disappeared during update").await;
            Err(ApiError::NotFound("Project"))
        }
        Err(e) => {
            discard(state.images.as_ref(), &uploaded_ids, "project update failed").await;
            Err(ApiError::Internal(e))
        }
    }
}

/// Delete a project and its remote images
///
/// DELETE /api/projects/{id}
/// Returns: { "message": "Project deleted", "id": "..." }
async fn delete_project(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let (public_ids, folder) = state.projects.delete(&id).await?.ok_or(ApiError::NotFound("Project"))?;

    discard(state.images.as_ref(), &public_ids, "project deleted").await;
    if let Some(folder) = folder {
        if let Err(e) = state.images.delete_folder(&folder).await {
            tracing::warn!("⚠️ Could not remove image folder {}: {:#}", folder, e);
        }
    }

    tracing::info!("🗑️ {} deleted project {}", admin.email, id);
    Ok(Json(json!({ "message": "Project deleted", "id": id })))
}

/// Reorder the gallery
///
/// PATCH /api/projects/order
/// Body: { "ids": ["...", "..."] }
/// Returns: { "updated": 2 }
async fn reorder_projects(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<Value>, ApiError> {
    let updated = state.projects.reorder(&payload.ids).await?;
    tracing::info!("🔀 {} reordered {} of {} projects", admin.email, updated, payload.ids.len());
    Ok(Json(json!({ "updated": updated })))
}

/// Upload every image, undoing the ones already uploaded if one fails
async fn upload_all(
    store: &dyn ImageStore,
    folder: &str,
    images: &[ImageUpload],
) -> Result<Vec<NewImage>, ApiError> {
    let mut uploaded = Vec::with_capacity(images.len());

    for image in images {
        match store.upload(folder, image).await {
            Ok(stored) => uploaded.push(NewImage { stored, alt: None }),
            Err(e) => {
                let done: Vec<String> = uploaded.iter().map(|image: &NewImage| image.stored.public_id.clone()).collect();
                discard(store, &done, "upload batch failed").await;
                return Err(ApiError::Internal(e));
            }
        }
    }

    Ok(uploaded)
}
