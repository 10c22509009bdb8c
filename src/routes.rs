use crate::app::AppState;
use crate::handlers::{ask_handler, health_check};
use axum::{Router, routing::get, routing::post};
use tower_http::services::ServeFile;

/// Creates and configures all application routes
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route_service("/", ServeFile::new("static/index.html"))
        .route("/health", get(health_check))
        .route("/ask", post(ask_handler))
}
