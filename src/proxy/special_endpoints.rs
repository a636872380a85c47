//! Special endpoint handlers for the proxy.
//!
//! This module provides response generators for built-in endpoints:
//! - `/health` - Health check endpoint
//! - `/metrics` - Prometheus metrics export
//! - fallbacks for unknown paths and unsupported methods
//!
//! Functions return `ProxyResponse` instead of writing directly to session,
//! so response generation stays testable without a live connection.

use bytes::Bytes;
use std::time::Instant;

use crate::metrics::ProxyMetrics;
use crate::pipeline::ProxyResponse;

/// Generate response for /health endpoint.
///
/// Returns health status with uptime and version information.
pub fn handle_health(start_time: Instant) -> ProxyResponse {
    ProxyResponse::json(
        200,
        serde_json::json!({
            "status": "healthy",
            "uptime_seconds": start_time.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION")
        }),
    )
    .with_header("Cache-Control", "no-store")
}

/// Generate response for /metrics endpoint.
pub fn handle_metrics(metrics: &ProxyMetrics) -> ProxyResponse {
    match metrics.export() {
        Ok(text) => {
            let body = Bytes::from(text);
            ProxyResponse {
                status: 200,
                headers: vec![
                    ("Content-Type", "text/plain; version=0.0.4".to_string()),
                    ("Content-Length", body.len().to_string()),
                ],
                body,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            ProxyResponse::json(500, serde_json::json!({ "error": "Failed to encode metrics" }))
        }
    }
}

pub fn handle_not_found() -> ProxyResponse {
    ProxyResponse::json(404, serde_json::json!({ "error": "Not found" }))
}

pub fn handle_method_not_allowed() -> ProxyResponse {
    ProxyResponse::json(405, serde_json::json!({ "error": "Method not allowed" }))
        .with_header("Allow", "GET, HEAD")
}
