//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::engine::{RetryPolicy, TransferEngine};
use crate::store::Store;
use crate::token::Maker;

pub use routes::{create_protected_router, create_public_router};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub token_maker: Arc<dyn Maker>,
    pub engine: TransferEngine,
    pub access_token_duration: chrono::Duration,
}

impl AppState {
    /// Wire the engine and the handlers to the same store
    pub fn new<S>(
        store: Arc<S>,
        token_maker: Arc<dyn Maker>,
        retry: RetryPolicy,
        access_token_duration: chrono::Duration,
    ) -> Self
    where
        S: Store + 'static,
    {
        let engine = TransferEngine::new(store.clone(), retry);
        Self {
            store,
            token_maker,
            engine,
            access_token_duration,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Auth runs only for matched protected routes
    let protected_routes = create_protected_router().route_layer(
        axum_middleware::from_fn_with_state(state.clone(), middleware::auth_middleware),
    );

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .merge(create_public_router())
        .merge(protected_routes)
        // First layer listed runs first
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(axum_middleware::from_fn(middleware::logging_middleware)),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
