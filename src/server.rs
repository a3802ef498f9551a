/// Server setup and initialization
///
/// Wires together all components: database, sign-in, image storage and HTTP
/// routes. Provides the application factory used by `main` and the tests.

use crate::{
    api::{
        create_auth_routes, create_media_routes, create_project_routes, create_site_settings_routes,
        create_tag_routes, AppState,
    },
    auth::GoogleOAuth,
    config::Config,
    db,
    media::{CloudinaryClient, ImageStore, UnconfiguredImageStore},
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes
///
/// Opens the database, picks the image store (Cloudinary when configured) and
/// builds the router.
pub async fn create_app(config: Config) -> Result<Router> {
    if let Some(dir) = sqlite_parent_dir(&config.database.url) {
        tracing::info!("📁 Ensuring data directory exists: {}", dir);
        std::fs::create_dir_all(&dir)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", dir, e))?;
    }

    let pool = db::connect(&config.database.url).await?;

    let images: Arc<dyn ImageStore> = match &config.cloudinary {
        Some(cloudinary) => {
            tracing::info!("☁️ Using Cloudinary cloud '{}'", cloudinary.cloud_name);
            Arc::new(CloudinaryClient::new(cloudinary.clone()))
        }
        None => {
            tracing::warn!("⚠️ Cloudinary credentials missing; image uploads will fail");
            Arc::new(UnconfiguredImageStore)
        }
    };

    if config.auth.session_secret.is_empty() {
        tracing::warn!("⚠️ SESSION_SECRET is empty; session tokens are hashed without a key");
    }
    if config.auth.google_client_id.is_empty() {
        tracing::warn!("⚠️ GOOGLE_CLIENT_ID is empty; sign-in will fail");
    }

    let oauth = Arc::new(GoogleOAuth::new(
        config.auth.google_client_id.clone(),
        config.auth.google_client_secret.clone(),
    ));

    let state = AppState::new(pool, config, images, oauth);
    if state.allowlist.is_empty() {
        tracing::warn!("⚠️ ADMIN_EMAILS is empty; nobody can reach the admin area");
    } else {
        tracing::info!("🔐 {} admin e-mail(s) on the allowlist", state.allowlist.len());
    }

    Ok(build_router(state))
}

/// Assemble every route around an existing state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(create_project_routes())
        .merge(create_tag_routes())
        .merge(create_site_settings_routes())
        .merge(create_media_routes())
        .merge(create_auth_routes())
        .with_state(state)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting showcase server...");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_app(config).await?;

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Directory of a file-backed SQLite url, if it has one
fn sqlite_parent_dir(url: &str) -> Option<String> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }

    let parent = std::path::Path::new(path).parent()?.to_str()?;
    (!parent.is_empty()).then(|| parent.to_string())
}
