//! AgentGate Telemetry - Observability Infrastructure
//!
//! Structured JSON logging through `tracing` and Prometheus metrics for the
//! API layer.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, AgentGateMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig};
