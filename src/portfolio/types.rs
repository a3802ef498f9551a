/// Portfolio project type definitions

use crate::{media::StoredImage, tags::Tag};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A project shown in the portfolio, with its tags and images
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub featured: bool,
    /// Position in the gallery; lower comes first, ties go to the newest project
    pub display_order: i64,
    /// Cloudinary folder holding this project's images
    pub cloudinary_folder: Option<String>,
    pub tags: Vec<Tag>,
    pub images: Vec<ProjectImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project row without its relations
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ProjectRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub featured: bool,
    pub display_order: i64,
    pub cloudinary_folder: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRow {
    pub(crate) fn with_relations(self, tags: Vec<Tag>, images: Vec<ProjectImage>) -> Project {
        Project {
            id: self.id,
            title: self.title,
            description: self.description,
            featured: self.featured,
            display_order: self.display_order,
            cloudinary_folder: self.cloudinary_folder,
            tags,
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectImage {
    pub id: String,
    pub project_id: String,
    pub url: String,
    pub public_id: String,
    pub alt: Option<String>,
    pub position: i64,
}

/// An image already stored remotely, ready to be attached to a project
#[derive(Debug, Clone)]
pub struct NewImage {
    pub stored: StoredImage,
    pub alt: Option<String>,
}

/// Input for creating a project
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub id: String,
    pub title: String,
    pub description: String,
    pub featured: bool,
    pub cloudinary_folder: Option<String>,
    /// Tag names, resolved (and created if needed) in the same transaction
    pub tag_names: Vec<String>,
    pub images: Vec<NewImage>,
}

/// Partial update of a project; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub featured: Option<bool>,
    /// Replaces the full tag set when present
    pub tag_names: Option<Vec<String>>,
    /// Images to detach from the project
    pub remove_image_ids: Vec<String>,
    /// Images appended after the existing ones
    pub add_images: Vec<NewImage>,
    /// New file for an existing image id; position is kept
    pub replace_images: Vec<(String, NewImage)>,
    /// Desired image order; ids not belonging to the project are ignored
    pub image_order: Option<Vec<String>>,
}

/// Updated project and the remote assets the update let go of
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub project: Project,
    /// Public ids no longer referenced after the update: removed or replaced
    /// images, plus new uploads whose target image had disappeared
    pub released_public_ids: Vec<String>,
}
