mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod sync;
mod websocket;

use axum::Router;
use config::Config;
use db::dbnotes::{DbNotes, NoteStore};
use docs::ApiDoc;
use routes::{cors_layer, create_api_routes, create_sync_routes};
use std::future::IntoFuture;
use std::panic;
use std::sync::Arc;
use std::time::Instant;
use sync::SyncService;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn NoteStore>,
    pub sync: Arc<SyncService>,
    pub started_at: Instant,
}

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "syncpad=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Connect to the database. Serving without storage is not supported, so
    // bail out before binding the listener if it is unreachable.
    let Some(db_url) = config.db_url.clone() else {
        error!("No database URL configured");
        std::process::exit(1);
    };
    let db = match DbNotes::new(&db_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    let store: Arc<dyn NoteStore> = Arc::new(db);

    // Report the newest stored note. Failing here is not fatal, the
    // connection test above already passed.
    match store.find_latest().await {
        Ok(Some(note)) => info!(
            "Latest stored note belongs to owner '{}' ({} bytes)",
            note.owner_id,
            note.content.len()
        ),
        Ok(None) => info!("No notes stored yet"),
        Err(e) => error!("Error loading initial content: {}", e),
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        store: store.clone(),
        sync: Arc::new(SyncService::new(store.clone())),
        started_at: Instant::now(),
    });

    // Create API routes
    let api_routes = create_api_routes(state.clone());
    let sync_routes = create_sync_routes(state.clone());

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", api_routes)
        // Mount the websocket sync endpoint
        .merge(sync_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        // Add CORS layer
        .layer(cors_layer(&config));

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!(
        "📡 Sync websocket available at ws://{}/sync",
        config.server_address()
    );
    info!(
        "📚 Swagger UI available at http://{}/swagger",
        config.server_address()
    );

    // Serve until a shutdown signal arrives. The listener closes first,
    // then the store, with no drain period for in-flight connections.
    tokio::select! {
        result = axum::serve(listener, app_routes).into_future() => {
            result.expect("Server failed to start");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, closing listener");
        }
    }

    store.close().await;
    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
