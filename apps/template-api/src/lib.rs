//! Template API server library
//!
//! Exposes the router and the modules behind it so integration tests can
//! drive the service in-process.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod notify;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Template creation from document payloads
        .route("/api/templates/pdf", post(handlers::create_template))
        // Signer lookup by signing key
        .route("/api/signing-key/verify", post(handlers::verify_signing_key))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
