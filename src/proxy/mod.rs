// Proxy module - Pingora ProxyHttp implementation
// Serves every request from request_filter; nothing is forwarded upstream

pub mod helpers;
pub mod special_endpoints;

use async_trait::async_trait;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::constants::{HEALTH_PATH, METRICS_PATH, PROXY_PATH};
use crate::metrics::ProxyMetrics;
use crate::pipeline::{ProxyResponse, TransformPipeline};
use helpers::{extract_query_params, header_value, request_id, REQUEST_ID_HEADER};

/// Where a request is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Transform,
    Health,
    Metrics,
    NotFound,
    MethodNotAllowed,
}

/// Map method and path to a route. Only GET and HEAD are served.
pub fn route(method: &str, path: &str) -> Route {
    let target = match path {
        PROXY_PATH => Route::Transform,
        HEALTH_PATH => Route::Health,
        METRICS_PATH => Route::Metrics,
        _ => return Route::NotFound,
    };

    if method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD") {
        target
    } else {
        Route::MethodNotAllowed
    }
}

/// Per-request context
#[derive(Debug, Clone)]
pub struct ProxyContext {
    request_id: String,
    started: Instant,
}

impl ProxyContext {
    pub fn new() -> Self {
        Self {
            request_id: String::new(),
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Default for ProxyContext {
    fn default() -> Self {
        Self::new()
    }
}

/// ImageProxy implements the Pingora ProxyHttp trait
/// Handles routing and hands /proxy requests to the transform pipeline
pub struct ImageProxy {
    pipeline: Arc<TransformPipeline>,
    /// Proxy start time (for uptime calculation in /health endpoint)
    start_time: Instant,
}

impl ImageProxy {
    pub fn new(pipeline: TransformPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            start_time: Instant::now(),
        }
    }

    /// Write a complete response to the session.
    ///
    /// HEAD requests get the same headers as GET, without the body.
    async fn write_response(
        session: &mut Session,
        response: ProxyResponse,
        ctx: &ProxyContext,
        head_only: bool,
    ) -> Result<()> {
        let mut header = ResponseHeader::build(response.status, None)?;
        for (name, value) in response.headers {
            header.insert_header(name, value)?;
        }
        header.insert_header(REQUEST_ID_HEADER, ctx.request_id.as_str())?;

        session
            .write_response_header(Box::new(header), head_only)
            .await?;
        if !head_only {
            session
                .write_response_body(Some(response.body), true)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProxyHttp for ImageProxy {
    type CTX = ProxyContext;

    fn new_ctx(&self) -> Self::CTX {
        ProxyContext::new()
    }

    /// Never reached: request_filter answers every request
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "image proxy has no upstream peer",
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        ctx.request_id = request_id(req);
        let method = req.method.as_str().to_string();
        let path = req.uri.path().to_string();
        let head_only = method.eq_ignore_ascii_case("HEAD");

        let response = match route(&method, &path) {
            Route::Transform => {
                let query = extract_query_params(req);
                let accept = header_value(req, "accept").map(str::to_string);
                let span = tracing::info_span!("transform", request_id = %ctx.request_id);
                self.pipeline
                    .handle(&query, accept.as_deref())
                    .instrument(span)
                    .await
            }
            Route::Health => special_endpoints::handle_health(self.start_time),
            Route::Metrics => special_endpoints::handle_metrics(ProxyMetrics::global()),
            Route::NotFound => special_endpoints::handle_not_found(),
            Route::MethodNotAllowed => special_endpoints::handle_method_not_allowed(),
        };

        let status = response.status;
        Self::write_response(session, response, ctx, head_only).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            method = %method,
            path = %path,
            status = status,
            duration_ms = ctx.started.elapsed().as_millis() as u64,
            "Request completed"
        );

        Ok(true)
    }
}
