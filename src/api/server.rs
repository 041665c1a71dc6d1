//! HTTP server setup and routing

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::{Pool, Sqlite};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
///
/// AppContext implements Clone, which gives us `FromRef<AppContext>` for free
/// via Axum's blanket implementation, so extractors like `AuthUser` can reach
/// into it.
#[derive(Clone)]
pub struct AppContext {
    pub coordinator: Arc<Coordinator>,
    pub db_pool: Pool<Sqlite>,
    pub config: Arc<Config>,
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/auth/login", post(super::handlers::login))
        // Track catalog
        .route(
            "/tracks",
            get(super::handlers::list_tracks).post(super::handlers::register_track),
        )
        .route("/tracks/:track_id", axum::routing::delete(super::handlers::delete_track))
        // Queue
        .route("/queue", get(super::handlers::get_queue))
        .route(
            "/queue/:id",
            post(super::handlers::add_to_queue).delete(super::handlers::remove_queue_entry),
        )
        .route("/queue/reorder", post(super::handlers::reorder_queue))
        // Playback control
        .route("/playback", patch(super::handlers::update_playback))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until shutdown
pub async fn run(config: &Config, ctx: AppContext) -> Result<()> {
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Http(format!("server error: {}", e)))?;

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
