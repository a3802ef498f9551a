/// HTTP API layer
///
/// REST endpoints for the public site and the admin area. Every resource has
/// its own router builder; reads are public, every mutation goes through the
/// admin guard first.

use crate::{
    auth::{AdminAllowlist, AuthStorage, OAuthProvider},
    config::Config,
    media::ImageStore,
    portfolio::ProjectStorage,
    settings::SettingsStorage,
    tags::TagStorage,
};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

// Sign-in, sign-out and session endpoints
pub mod auth;

// Error type shared by handlers and the guard
pub mod error;

// Multipart project form parsing
pub mod form;

// Cloudinary maintenance endpoints
pub mod media;

// Project CRUD and ordering
pub mod projects;

// Editable page copy
pub mod site_settings;

// Tag CRUD
pub mod tags;

pub use auth::create_auth_routes;
pub use error::ApiError;
pub use media::create_media_routes;
pub use projects::create_project_routes;
pub use site_settings::create_site_settings_routes;
pub use tags::create_tag_routes;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Users, sessions and OAuth state
    pub auth: AuthStorage,
    /// Addresses granted admin rights at sign-in
    pub allowlist: Arc<AdminAllowlist>,
    pub oauth: Arc<dyn OAuthProvider>,
    pub projects: ProjectStorage,
    pub tags: TagStorage,
    pub settings: SettingsStorage,
    /// Remote image storage (Cloudinary in production)
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        config: Config,
        images: Arc<dyn ImageStore>,
        oauth: Arc<dyn OAuthProvider>,
    ) -> Self {
        Self {
            auth: AuthStorage::new(pool.clone(), config.auth.session_secret.clone()),
            allowlist: Arc::new(AdminAllowlist::from_csv(&config.auth.admin_emails)),
            oauth,
            projects: ProjectStorage::new(pool.clone()),
            tags: TagStorage::new(pool.clone()),
            settings: SettingsStorage::new(pool),
            images,
            config: Arc::new(config),
        }
    }
}
