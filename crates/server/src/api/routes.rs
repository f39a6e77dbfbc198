use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::{convert, handlers, middleware::metrics_middleware, middleware::security_headers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config().server.static_dir.clone();
    let downloads_dir = state.storage().config().downloads_dir();
    let body_limit = state.config().server.max_upload_bytes;

    // API routes
    let api_routes = Router::new()
        // Health, config and pool status
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        // Conversion
        .route("/convert-batch", post(convert::convert_batch))
        .with_state(Arc::clone(&state));

    // Unversioned aliases kept for the browser UI
    let root_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/convert-batch", post(convert::convert_batch))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state);

    // Serve the UI with index fallback
    let serve_dir =
        ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let [nosniff, frame_options, xss_protection] = security_headers();

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(root_routes)
        .nest_service("/downloads", ServeDir::new(downloads_dir))
        .fallback_service(serve_dir)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(nosniff)
        .layer(frame_options)
        .layer(xss_protection)
}
