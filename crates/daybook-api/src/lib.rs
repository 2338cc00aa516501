//! Daybook API - REST server
//!
//! User signup and login with JWT-based authentication. The auth gate in
//! [`auth::middleware`] produces the identity consumed by protected routes.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::Router;
use openapi::{ApiDoc, OPENAPI_PATH, SWAGGER_PATH};
use state::AppState;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = routes::cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::user_routes(state.clone()))
        .merge(SwaggerUi::new(SWAGGER_PATH).url(OPENAPI_PATH, ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wait for `signal`, then report not-ready so `/ready` fails while
/// in-flight requests drain
pub async fn shutdown_signal<F>(state: Arc<AppState>, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    state.set_ready(false);
    tracing::info!("shutdown requested, draining connections");
}

/// Router over an in-memory user store, for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(AppState::for_testing()))
}

/// Like [`create_router_for_testing`] but sharing the state with the caller
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_with_state_for_testing() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::for_testing());
    (create_router(state.clone()), state)
}
