//! Proxy utility functions.
//!
//! This module contains helper functions for request processing:
//! - Query parameter parsing
//! - Header extraction from Pingora requests
//! - Request ID selection

use std::collections::HashMap;

use pingora_http::RequestHeader;
use url::form_urlencoded;
use uuid::Uuid;

/// Header carrying the request ID in both directions
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Extract query parameters from the request URI.
pub fn extract_query_params(req: &RequestHeader) -> HashMap<String, String> {
    req.uri.query().map(parse_query).unwrap_or_default()
}

/// Parse a raw query string.
///
/// Values are URL-decoded (`+` becomes a space). When a key repeats, the
/// first occurrence wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// Get a header value as a string. Non-UTF8 values are treated as absent.
pub fn header_value<'a>(req: &'a RequestHeader, name: &str) -> Option<&'a str> {
    req.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Reuse a caller supplied request ID when it looks sane, otherwise mint a UUID.
pub fn request_id(req: &RequestHeader) -> String {
    header_value(req, REQUEST_ID_HEADER)
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= 128 && id.bytes().all(|b| b.is_ascii_graphic()))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
