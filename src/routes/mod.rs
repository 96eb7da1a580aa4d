pub mod candidate;
pub mod health;
pub mod metrics;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Multipart framing allowance on top of the document size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState, prometheus: Arc<PrometheusHandle>) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/v1/candidates/{candidate_id}",
            axum::routing::put(candidate::register_candidate),
        )
        .route(
            "/api/v1/candidates/{candidate_id}/resume",
            post(candidate::upload_resume),
        )
        .route(
            "/api/v1/candidates/{candidate_id}/profile",
            get(candidate::get_profile),
        )
        .route(
            "/api/v1/candidates/{candidate_id}/parsing",
            get(candidate::get_parsing_status),
        )
        .with_state(state.clone())
        // Prometheus scrape endpoint (separate state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state((prometheus, state.queue)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
}
