//! HTTP server for runcoachd

use crate::config::ServerConfig;
use crate::orchestrator::IngestionOrchestrator;
use crate::routes;
use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Maximum request body size: 64 KiB
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: IngestionOrchestrator,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: IngestionOrchestrator) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
        }
    }
}

/// Credentialed CORS for a single origin; methods and headers mirror the request.
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid allowed origin: {}", origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Build the application router
pub fn router(state: AppState, allowed_origin: Option<&str>) -> Result<Router> {
    let app = Router::new()
        .merge(routes::health_routes())
        .merge(routes::result_routes())
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http());

    match allowed_origin {
        Some(origin) => {
            info!("  CORS allowed origin: {}", origin);
            Ok(app.layer(cors_layer(origin)?))
        }
        None => Ok(app),
    }
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = router(state, config.allowed_origin.as_deref())?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("  Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}
