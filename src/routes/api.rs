use crate::config::Config;
use crate::handlers::{health_check, status};
use crate::websocket::handler::sync_handler;
use crate::AppState;
use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .with_state(state)
}

/// Create the websocket sync route
pub fn create_sync_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sync", get(sync_handler))
        .with_state(state)
}

/// Build the CORS layer from the configured origins.
///
/// Origins are a comma-separated list; unparseable entries are dropped with
/// a warning.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .as_deref()
        .unwrap_or("http://localhost:3000")
        .split(',')
        .filter_map(|origin| {
            let origin = origin.trim();
            match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
}
