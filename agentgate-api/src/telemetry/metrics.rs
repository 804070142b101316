//! Prometheus Metrics Definitions
//!
//! Defines all AgentGate metrics with their labels. Exposed on `/metrics`
//! for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Completion latency buckets (seconds). Model calls are slow.
const COMPLETION_LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<AgentGateMetrics>> = Lazy::new(AgentGateMetrics::new);

fn registration_failed(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all AgentGate metrics.
#[derive(Clone)]
pub struct AgentGateMetrics {
    /// HTTP request counter - labels: method, route, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, route
    pub http_request_duration_seconds: HistogramVec,

    /// Authorization decisions - labels: decision
    pub authz_decisions_total: CounterVec,

    /// Registry mutations - labels: operation, outcome
    pub registry_mutations_total: CounterVec,

    /// Completion backend calls - labels: outcome
    pub completion_calls_total: CounterVec,

    /// Completion backend latency - labels: outcome
    pub completion_duration_seconds: HistogramVec,

    /// Agents in the registry at the last readiness probe
    pub registered_agents: Gauge,
}

impl AgentGateMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "agentgate_http_requests_total",
                "Total number of HTTP requests",
                &["method", "route", "status"]
            )
            .map_err(|e| registration_failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "agentgate_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "route"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("http_request_duration_seconds", e))?,

            authz_decisions_total: register_counter_vec!(
                "agentgate_authz_decisions_total",
                "Authorization decisions by outcome",
                &["decision"]
            )
            .map_err(|e| registration_failed("authz_decisions_total", e))?,

            registry_mutations_total: register_counter_vec!(
                "agentgate_registry_mutations_total",
                "Registry mutations by operation and outcome",
                &["operation", "outcome"]
            )
            .map_err(|e| registration_failed("registry_mutations_total", e))?,

            completion_calls_total: register_counter_vec!(
                "agentgate_completion_calls_total",
                "Completion backend calls by outcome",
                &["outcome"]
            )
            .map_err(|e| registration_failed("completion_calls_total", e))?,

            completion_duration_seconds: register_histogram_vec!(
                "agentgate_completion_duration_seconds",
                "Completion backend call duration in seconds",
                &["outcome"],
                COMPLETION_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("completion_duration_seconds", e))?,

            registered_agents: register_gauge!(
                "agentgate_registered_agents",
                "Number of agents in the registry"
            )
            .map_err(|e| registration_failed("registered_agents", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, route, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }

    pub fn record_authz_decision(&self, decision: &str) {
        self.authz_decisions_total
            .with_label_values(&[decision])
            .inc();
    }

    pub fn record_registry_mutation(&self, operation: &str, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.registry_mutations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn record_completion(&self, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "error" };
        self.completion_calls_total
            .with_label_values(&[outcome])
            .inc();
        self.completion_duration_seconds
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    pub fn set_registered_agents(&self, count: usize) {
        self.registered_agents.set(count as f64);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
