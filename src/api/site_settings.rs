/// Site settings REST API endpoints
///
/// Backs the editable About page copy.

use crate::{
    api::{error::ApiError, AppState},
    auth::AdminGuard,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    /// Comma separated keys; all settings when absent
    pub keys: Option<String>,
}

/// Request body for settings updates
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SettingsUpdate {
    /// { "settings": { "about.hero": "..." } }
    Many { settings: BTreeMap<String, String> },
    /// { "key": "about.hero", "value": "..." }
    One { key: String, value: String },
}

impl SettingsUpdate {
    fn into_entries(self) -> BTreeMap<String, String> {
        match self {
            SettingsUpdate::Many { settings } => settings,
            SettingsUpdate::One { key, value } => BTreeMap::from([(key, value)]),
        }
    }
}

/// Create site settings routes
pub fn create_site_settings_routes() -> Router<AppState> {
    Router::new().route("/api/site-settings", get(get_settings).patch(update_settings))
}

/// GET /api/site-settings[?keys=about.hero,about.story]
/// Returns: { "settings": { "about.hero": "..." } }
async fn get_settings(
    State(state): State<AppState>,
    Query(query): Query<SettingsQuery>,
) -> Result<Json<Value>, ApiError> {
    let settings = match query.keys {
        Some(keys) => {
            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect();
            state.settings.get_many(&keys).await?
        }
        None => state.settings.get_all().await?,
    };

    Ok(Json(json!({ "settings": settings })))
}

/// PATCH /api/site-settings
/// Body: { "settings": { "key": "value" } } or { "key": "...", "value": "..." }
/// Returns the full settings map after the update
async fn update_settings(
    AdminGuard(admin): AdminGuard,
    State(state): State<AppState>,
    Json(payload): Json<SettingsUpdate>,
) -> Result<Json<Value>, ApiError> {
    let entries = payload.into_entries();
    if entries.is_empty() {
        return Err(ApiError::bad_request("No settings provided"));
    }
    if entries.keys().any(|key| key.trim().is_empty()) {
        return Err(ApiError::bad_request("Setting keys must not be empty"));
    }

    let written = state.settings.upsert_many(&entries).await?;
    tracing::info!("📝 {} updated {} site settings", admin.email, written);

    let settings = state.settings.get_all().await?;
    Ok(Json(json!({ "settings": settings })))
}
