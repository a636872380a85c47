// Request pipeline module - runs a /proxy request from query string to response
//
// Stages, each short-circuiting to an error response on failure:
// config -> params -> origin -> format -> fetch -> transform -> respond

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ConfigProvider;
use crate::constants::{DEFAULT_QUALITY, DEFAULT_TARGET_WIDTH, MAX_STALE_WHILE_REVALIDATE};
use crate::error::ProxyError;
use crate::fetch::SourceFetcher;
use crate::image::{negotiate_format, vary_header, ImageTranscoder, TranscodeRequest, TranscodedImage};
use crate::metrics::ProxyMetrics;
use crate::origin::is_origin_allowed;
use crate::params;
use crate::request_coalescing::{CoalesceRole, RequestCoalescer};
use crate::signing::canonical_payload;

/// Outcome of one fetch + transform, shared between coalesced requests
pub type TransformOutcome = Result<Arc<TranscodedImage>, ProxyError>;

/// Framework-independent response produced by the pipeline.
///
/// The proxy layer copies it onto the session; tests inspect it directly.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
}

impl ProxyResponse {
    /// JSON `{"error": ...}` body; error responses are never cached
    pub fn error(err: &ProxyError) -> Self {
        Self::json(err.status(), serde_json::json!({ "error": err.to_string() }))
            .with_header("Cache-Control", "no-store")
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        let body = Bytes::from(value.to_string());
        Self {
            status,
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("Content-Length", body.len().to_string()),
            ],
            body,
        }
    }

    /// Successful image response with long-lived cache headers
    pub fn image(image: &TranscodedImage, cache_max_age: u64) -> Self {
        let body = image.data.clone();
        Self {
            status: 200,
            headers: vec![
                ("Content-Type", image.content_type().to_string()),
                ("Content-Length", body.len().to_string()),
                ("Cache-Control", cache_control(cache_max_age)),
                ("Vary", vary_header().to_string()),
            ],
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// First header value with a case-insensitive name match
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Cache-Control value for a successful transform
pub fn cache_control(max_age: u64) -> String {
    format!(
        "public, max-age={max_age}, s-maxage={max_age}, stale-while-revalidate={}",
        max_age.min(MAX_STALE_WHILE_REVALIDATE)
    )
}

/// The transform request handler
pub struct TransformPipeline {
    config: Arc<dyn ConfigProvider>,
    fetcher: Arc<dyn SourceFetcher>,
    transcoder: Arc<dyn ImageTranscoder>,
    coalescer: Option<RequestCoalescer<TransformOutcome>>,
}

impl TransformPipeline {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        fetcher: Arc<dyn SourceFetcher>,
        transcoder: Arc<dyn ImageTranscoder>,
    ) -> Self {
        Self {
            config,
            fetcher,
            transcoder,
            coalescer: None,
        }
    }

    /// Share fetch + transform between concurrent identical requests
    pub fn with_coalescing(mut self) -> Self {
        self.coalescer = Some(RequestCoalescer::new());
        self
    }

    /// Handle one /proxy request. Never fails: errors become JSON responses.
    pub async fn handle(
        &self,
        query: &HashMap<String, String>,
        accept: Option<&str>,
    ) -> ProxyResponse {
        let started = Instant::now();
        let response = match self.process(query, accept).await {
            Ok((image, cache_max_age)) => {
                tracing::info!(
                    format = %image.format,
                    natural_width = image.natural_size.0,
                    output_width = image.output_size.0,
                    bytes = image.data.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Image served"
                );
                ProxyMetrics::global().add_bytes_served(image.data.len());
                ProxyResponse::image(&image, cache_max_age)
            }
            Err(err) => {
                if err.status() >= 500 {
                    tracing::error!(kind = err.kind(), status = err.status(), error = %err, "Transform request failed");
                } else {
                    tracing::warn!(kind = err.kind(), status = err.status(), error = %err, "Transform request rejected");
                }
                ProxyResponse::error(&err)
            }
        };
        ProxyMetrics::global().record_request(response.status);
        response
    }

    async fn process(
        &self,
        query: &HashMap<String, String>,
        accept: Option<&str>,
    ) -> Result<(Arc<TranscodedImage>, u64), ProxyError> {
        // Resolved fresh for every request
        let config = self.config.resolve()?;

        let params = params::parse_and_verify(query, &config)?;

        if !is_origin_allowed(&params.url, &config) {
            return Err(ProxyError::Auth("Origin not allowed".to_string()));
        }

        let request = TranscodeRequest {
            format: negotiate_format(accept),
            target_width: Some(
                params
                    .width
                    .unwrap_or(DEFAULT_TARGET_WIDTH)
                    .min(config.max_width),
            ),
            quality: params.quality.unwrap_or(DEFAULT_QUALITY),
        };

        tracing::debug!(
            source_host = %url::Url::parse(&params.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default(),
            format = %request.format,
            target_width = ?request.target_width,
            quality = request.quality,
            "Transform request verified"
        );

        let image = match &self.coalescer {
            Some(coalescer) => {
                let key = format!(
                    "{}|{}",
                    canonical_payload(&params.url, request.target_width, Some(request.quality)),
                    request.format
                );
                let (outcome, role) = coalescer
                    .run(&key, || self.fetch_and_transcode(&params.url, request))
                    .await;
                if role == CoalesceRole::Follower {
                    ProxyMetrics::global().record_coalesced();
                }
                outcome?
            }
            None => self.fetch_and_transcode(&params.url, request).await?,
        };

        Ok((image, config.cache_max_age))
    }

    async fn fetch_and_transcode(&self, url: &str, request: TranscodeRequest) -> TransformOutcome {
        let metrics = ProxyMetrics::global();

        let fetch_started = Instant::now();
        let source = self.fetcher.fetch(url).await?;
        metrics.observe_fetch(fetch_started.elapsed());

        // CPU-bound; keep it off the reactor threads
        let transcoder = Arc::clone(&self.transcoder);
        let transform_started = Instant::now();
        let image = tokio::task::spawn_blocking(move || transcoder.transcode(&source, &request))
            .await
            .map_err(|e| ProxyError::Transform(format!("Transform task failed: {e}")))??;
        metrics.observe_transform(request.format, transform_started.elapsed());

        Ok(Arc::new(image))
    }
}
