/// Showcase: portfolio site backend with an admin-gated content API
///
/// This library provides the public read API (projects, tags, page copy), the
/// admin-only mutation API, Google sign-in with database sessions, and the
/// Cloudinary image integration.

// Core configuration and setup
pub mod config;

// SQLite pool and schema
pub mod db;

// Sign-in, sessions and the admin guard
pub mod auth;

// Portfolio projects and their images
pub mod portfolio;

// Project tags and the tag resolution helper
pub mod tags;

// Editable page copy
pub mod settings;

// Image validation and remote storage
pub mod media;

// HTTP API layer - REST endpoints for the site and the admin area
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use api::{ApiError, AppState};
pub use auth::{require_admin, AdminGuard};
pub use portfolio::Project;
pub use server::{build_router, create_app, start_server};
