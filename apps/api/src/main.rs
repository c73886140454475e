use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::auth::session::{SessionStore, SystemClock};
use api::config::Config;
use api::routes::build_router;
use api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Docgen API v{}", env!("CARGO_PKG_VERSION"));
    info!("Template directory: {}", config.template_dir.display());

    if !config.template_dir.is_dir() {
        warn!(
            "Template directory {} does not exist; generation will fail until it is created",
            config.template_dir.display()
        );
    }
    if config.auth_password.is_none() {
        warn!("AUTH_PASSWORD not set; /api/v1/generate is not gated");
    }

    let sessions = Arc::new(SessionStore::new(
        Duration::hours(config.session_ttl_hours),
        Arc::new(SystemClock),
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        sessions,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
