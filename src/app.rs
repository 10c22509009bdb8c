use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::completion::{CompletionProvider, OpenAiClient};
use crate::config::Config;
use crate::routes::create_routes;

/// Shared state handed to every request handler.
///
/// Everything inside is read-only after startup; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub completion: Arc<dyn CompletionProvider>,
}

/// Initialize tracing and logging for the application
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rs_persona_svc=info,tower_http=debug,axum::rejection=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Assemble the router around an already-built application state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(create_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Create and configure the Axum application with all routes and middleware
pub fn create_app(config: &Config) -> Result<Router, anyhow::Error> {
    info!("Initializing application router");

    let completion = OpenAiClient::new(reqwest::Client::new(), config.openai_api_key.clone())?;
    info!("Completion client initialized");

    Ok(router(AppState {
        completion: Arc::new(completion),
    }))
}
