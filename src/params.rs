//! Proxy request parameter parsing and validation
//!
//! Extracts `url`, `w`, `q` and `sig` from the query string, bounds-checks
//! them and verifies the signature. Each failure carries the HTTP status the
//! handler should answer with:
//!
//! | Check                        | Status |
//! |------------------------------|--------|
//! | `url` missing or blank       | 400    |
//! | `sig` missing or blank       | 401    |
//! | `w` not in 1..=max_width     | 400    |
//! | `q` not in 1..=100           | 400    |
//! | signature mismatch           | 403    |

use std::collections::HashMap;
use std::fmt;

use crate::config::ImageProxyConfig;
use crate::constants::{MAX_QUALITY, QUALITY_PARAM, SIG_PARAM, URL_PARAM, WIDTH_PARAM};
use crate::signing;

/// Parameters that passed validation and signature verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedParams {
    /// Source URL, trimmed
    pub url: String,
    pub width: Option<u32>,
    pub quality: Option<u8>,
}

/// Rejection with the status code to respond with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamError {
    pub message: String,
    pub status: u16,
}

impl ParamError {
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for ParamError {}

/// Validate query parameters and verify their signature.
///
/// The signature is checked against the `url` value exactly as received.
/// The returned URL is trimmed; trimming is deterministic, so the fetched
/// URL is still fully determined by the signed value.
pub fn parse_and_verify(
    query: &HashMap<String, String>,
    config: &ImageProxyConfig,
) -> Result<VerifiedParams, ParamError> {
    let url = match query.get(URL_PARAM) {
        Some(url) if !url.trim().is_empty() => url,
        _ => return Err(ParamError::new("Missing url parameter", 400)),
    };

    let signature = match query.get(SIG_PARAM) {
        Some(sig) if !sig.trim().is_empty() => sig,
        _ => return Err(ParamError::new("Missing sig parameter", 401)),
    };

    let width = match query.get(WIDTH_PARAM).filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(parse_bounded(raw, config.max_width).ok_or_else(|| {
            ParamError::new(format!("Invalid w: must be 1-{}", config.max_width), 400)
        })?),
        None => None,
    };

    let quality = match query.get(QUALITY_PARAM).filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            parse_bounded(raw, MAX_QUALITY as u32)
                .map(|q| q as u8)
                .ok_or_else(|| ParamError::new("Invalid q: must be 1-100", 400))?,
        ),
        None => None,
    };

    if !signing::verify(url, width, quality, signature, config.secret_bytes()) {
        return Err(ParamError::new("Invalid signature", 403));
    }

    Ok(VerifiedParams {
        url: url.trim().to_string(),
        width,
        quality,
    })
}

/// Strict base-10 parse into `1..=max`
fn parse_bounded(raw: &str, max: u32) -> Option<u32> {
    raw.parse::<u32>()
        .ok()
        .filter(|value| (1..=max).contains(value))
}
