use super::error::ServerError;
use super::routes;
use super::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes::health::health_handler))
        .route("/api/chat", post(routes::chat::chat_handler))
        .route("/api/tools", get(routes::tools::tools_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until ctrl-c, then cancels in-flight turns and drains connections.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<(), ServerError> {
    let shutdown = state.shutdown_token().clone();
    let app = build_router(state);

    info!(%addr, "binding HTTP server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "HTTP server ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(error) = result {
                warn!(%error, "failed to listen for ctrl-c");
            }
            info!("shutdown requested; cancelling in-flight chat turns");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}
