// Prometheus metrics for the image proxy
//
// Provides:
// - Request counter by response status
// - Transform latency histogram by output format
// - Upstream fetch latency histogram
// - Bytes served and coalesced request counters

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

use crate::image::OutputFormat;

/// Global metrics registry for the proxy
pub struct ProxyMetrics {
    /// Requests answered, labelled by HTTP status
    requests: IntCounterVec,

    /// Decode + resize + encode duration (in seconds)
    transform_duration: HistogramVec,

    /// Source fetch duration (in seconds)
    fetch_duration: Histogram,

    /// Image bytes written to clients
    bytes_served: IntCounter,

    /// Requests that reused another request's in-flight result
    coalesced: IntCounter,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<ProxyMetrics> = OnceLock::new();

impl ProxyMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let requests = register_int_counter_vec!(
                "image_proxy_requests_total",
                "Total number of proxy requests by response status",
                &["status"]
            )
            .expect("Failed to register image_proxy_requests_total metric");

            let transform_duration = register_histogram_vec!(
                "image_proxy_transform_duration_seconds",
                "Duration of image transforms in seconds",
                &["format"], // avif, webp, jpeg
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            )
            .expect("Failed to register image_proxy_transform_duration_seconds metric");

            let fetch_duration = register_histogram!(
                "image_proxy_upstream_fetch_duration_seconds",
                "Duration of upstream source fetches in seconds",
                vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
            )
            .expect("Failed to register image_proxy_upstream_fetch_duration_seconds metric");

            let bytes_served = register_int_counter!(
                "image_proxy_bytes_served_total",
                "Total image bytes served"
            )
            .expect("Failed to register image_proxy_bytes_served_total metric");

            let coalesced = register_int_counter!(
                "image_proxy_coalesced_requests_total",
                "Requests served from another request's in-flight transform"
            )
            .expect("Failed to register image_proxy_coalesced_requests_total metric");

            ProxyMetrics {
                requests,
                transform_duration,
                fetch_duration,
                bytes_served,
                coalesced,
            }
        })
    }

    pub fn record_request(&self, status: u16) {
        self.requests
            .with_label_values(&[&status.to_string()])
            .inc();
    }

    pub fn observe_transform(&self, format: OutputFormat, duration: Duration) {
        self.transform_duration
            .with_label_values(&[format.as_str()])
            .observe(duration.as_secs_f64());
    }

    pub fn observe_fetch(&self, duration: Duration) {
        self.fetch_duration.observe(duration.as_secs_f64());
    }

    pub fn add_bytes_served(&self, bytes: usize) {
        self.bytes_served.inc_by(bytes as u64);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.inc();
    }

    /// Number of requests recorded for a status
    pub fn request_count(&self, status: u16) -> u64 {
        self.requests.with_label_values(&[&status.to_string()]).get()
    }

    /// Export every registered metric in Prometheus text format
    /// for the /metrics endpoint
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
