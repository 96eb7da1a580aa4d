use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::services::queue::JobQueue;

/// Prometheus metrics scrape endpoint.
/// Refreshes the poll queue depth gauge, then renders the text exposition format.
pub async fn prometheus_metrics(
    State((handle, queue)): State<(Arc<PrometheusHandle>, Arc<JobQueue>)>,
) -> impl IntoResponse {
    match queue.queue_depth().await {
        Ok(depth) => metrics::gauge!("resume_poll_queue_depth").set(depth as f64),
        Err(e) => tracing::debug!(error = %e, "Could not read poll queue depth"),
    }
    handle.render()
}
