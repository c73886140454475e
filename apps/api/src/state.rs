use std::sync::Arc;

use crate::auth::session::SessionStore;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Process-wide session table; assumes a single-worker deployment.
    pub sessions: Arc<SessionStore>,
}
