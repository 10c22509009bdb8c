pub mod app;
pub mod completion;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

// Re-export key items for convenience
pub use app::{AppState, create_app, init_tracing};
