/// Showcase: portfolio site backend
///
/// Main entry point. Loads configuration from the environment and starts the
/// HTTP server.

use showcase::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Public content API at /api/projects, /api/tags, /api/site-settings
/// - Admin-only mutations on the same resources and /api/cloudinary-*
/// - Google sign-in at /api/auth/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3000 and data/showcase.db)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
