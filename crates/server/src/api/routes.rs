use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{audit, handlers, personnel, units};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Operator routes (authenticated)
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Organizational units
        .route("/units", post(units::create_unit))
        .route("/units/{id}", get(units::get_unit))
        .route("/units/{id}/sync-group", post(units::sync_group))
        // Personnel
        .route("/personnel", post(personnel::create_personnel))
        .route("/personnel/{id}", get(personnel::get_personnel))
        .route("/personnel/{id}/provision", post(personnel::provision))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(protected)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
