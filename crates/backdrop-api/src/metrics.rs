//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "backdrop_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "backdrop_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "backdrop_http_requests_in_flight";

    // Pipeline metrics
    pub const PIPELINE_STAGE_SECONDS: &str = "backdrop_pipeline_stage_seconds";
    pub const PIPELINE_RUNS_TOTAL: &str = "backdrop_pipeline_runs_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "backdrop_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how long one pipeline stage took.
pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
    histogram!(names::PIPELINE_STAGE_SECONDS, "stage" => stage).record(duration_secs);
}

/// Record a finished pipeline run.
pub fn record_pipeline_run(pipeline: &'static str, outcome: &'static str) {
    counter!(names::PIPELINE_RUNS_TOTAL, "pipeline" => pipeline, "outcome" => outcome).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Route template for labels; unmatched paths collapse into one series.
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let route = route_label(&request);
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    record_http_request(&method, &route, status, start.elapsed().as_secs_f64());

    response
}
