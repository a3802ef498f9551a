/// Multipart form parsing for project create/update requests

use crate::{api::error::ApiError, media::ImageUpload};
use axum::extract::Multipart;

/// Largest accepted project form: several images at the 10 MB cap plus text fields
pub const MAX_FORM_BYTES: usize = 64 * 1024 * 1024;

/// Field prefix for replacing an existing image: `replace:{imageId}`
const REPLACE_PREFIX: &str = "replace:";

/// Everything a project form may carry; absent fields stay `None`/empty
#[derive(Debug, Default)]
pub struct ProjectForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub featured: Option<bool>,
    pub tags: Option<Vec<String>>,
    /// Alt text applied to every image uploaded with this form
    pub alt: Option<String>,
    pub images: Vec<ImageUpload>,
    pub replacements: Vec<(String, ImageUpload)>,
    pub remove_image_ids: Vec<String>,
    pub image_order: Option<Vec<String>>,
}

impl ProjectForm {
    /// Every uploaded file, new and replacement
    pub fn all_uploads(&self) -> impl Iterator<Item = &ImageUpload> {
        self.images.iter().chain(self.replacements.iter().map(|(_, image)| image))
    }
}

/// Read the whole multipart body into a [`ProjectForm`]
pub async fn read_project_form(mut multipart: Multipart) -> Result<ProjectForm, ApiError> {
    let mut form = ProjectForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        if let Some(file_name) = file_name {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Could not read '{}': {}", name, e)))?;

            // Browsers submit untouched file inputs as an empty, unnamed part
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }

            let upload = ImageUpload {
                filename: file_name,
                content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
                bytes: bytes.to_vec(),
            };

            match name.strip_prefix(REPLACE_PREFIX) {
                Some(image_id) => form.replacements.push((image_id.to_string(), upload)),
                None => form.images.push(upload),
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Could not read '{}': {}", name, e)))?;

        match name.as_str() {
            "title" => form.title = Some(value),
            "description" => form.description = Some(value),
            "featured" => form.featured = Some(parse_bool(&value)?),
            "tags" => form.tags = Some(parse_list(&value)?),
            "alt" => form.alt = Some(value.trim().to_string()).filter(|alt| !alt.is_empty()),
            "removeImageIds" => form.remove_image_ids = parse_list(&value)?,
            "imageOrder" => form.image_order = Some(parse_list(&value)?),
            other => tracing::debug!("Ignoring unknown form field '{}'", other),
        }
    }

    Ok(form)
}

/// Checkbox-style boolean
pub fn parse_bool(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" | "" => Ok(false),
        other => Err(ApiError::bad_request(format!("Invalid boolean '{}'", other))),
    }
}

/// A JSON array of strings, or a comma separated list
pub fn parse_list(value: &str) -> Result<Vec<String>, ApiError> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| ApiError::bad_request(format!("Invalid list '{}': {}", trimmed, e)));
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}
