//! Router assembly for the property API
//!
//! Routes:
//! - GET  /healthz                    - liveness probe
//! - GET  /properties                 - filtered search
//! - POST /properties                 - multipart listing creation
//! - GET  /properties/{id}            - single listing
//! - GET  /properties/{id}/leases     - leases with tenant data

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{
    create_property, get_property, get_property_leases, healthz, search_properties, AppState,
};

/// Photo batches can be large; the default 2 MB body cap is too small.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/properties",
            get(search_properties).post(create_property),
        )
        .route("/properties/{id}", get(get_property))
        .route("/properties/{id}/leases", get(get_property_leases))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
