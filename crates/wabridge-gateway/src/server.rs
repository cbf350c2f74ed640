// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wabridge_config::model::ServerConfig;
use wabridge_core::BridgeError;
use wabridge_session::SessionController;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub controller: Arc<SessionController>,
}

/// Build the application router.
///
/// - GET /health and GET /images/{filename} are public
/// - every other route requires the bearer token when one is configured
pub fn router(state: GatewayState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/images/{filename}", get(handlers::get_image))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/pair", get(handlers::get_pair))
        .route("/send", post(handlers::post_send))
        .route("/devices", get(handlers::get_devices))
        .route("/disconnect", post(handlers::post_disconnect))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `config.bind_address()` and serve until `shutdown` is cancelled.
pub async fn serve(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), BridgeError> {
    let app = router(state, AuthConfig::new(config.bearer_token.clone()));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BridgeError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, auth = config.bearer_token.is_some(), "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| BridgeError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
