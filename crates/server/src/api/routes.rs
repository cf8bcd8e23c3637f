use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{audit, handlers, items, middleware::metrics_middleware, renewals};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Managed items
        .route("/items", get(items::list_items).post(items::create_item))
        .route("/items/{id}", get(items::get_item).delete(items::delete_item))
        .route("/items/{id}/request", post(items::request_certificate))
        // Renewals
        .route("/renewals", post(renewals::run_renewal))
        .route("/renewals/status", get(renewals::get_status));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
