//! Router construction for the relay server.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self as axum_mw, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use relay_engine::Relay;
use relay_logging::relay_info;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// Build the full axum router with all routes and middleware.
pub fn build_router(relay: Arc<Relay>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/init-workflow", post(handlers::init_workflow))
        .route("/api/submit-form", post(handlers::submit_form))
        .route("/api/submit-feedback", post(handlers::submit_feedback))
        .route("/api/check-outline", post(handlers::check_outline))
        .route("/api/store-outline", post(handlers::store_outline))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(axum_mw::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(AppState { relay })
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    relay_info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}
