//! Template API Server - creates signing templates from API payloads
//!
//! Provides REST endpoints for:
//! - Template creation from data-URI, URL, or base64 document payloads
//! - Signing key verification

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use template_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("template_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Initializing template API...");
    let state = AppState::new().await?;
    let state = Arc::new(state);

    let app = template_api::router(state);

    // Parse bind address
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting template API on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
