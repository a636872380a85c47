//! URL signing module
//!
//! Provides:
//! - Canonical payload construction (`url|w|q`)
//! - HMAC-SHA256 signature generation (lowercase hex)
//! - Constant-time signature verification
//! - Signed URL and srcset construction (see [`url_builder`])
//!
//! # Canonical payload
//!
//! ```text
//! payload   = url "|" width-or-empty "|" quality-or-empty
//! signature = hex(HMAC-SHA256(secret, payload))
//! ```
//!
//! An absent width or quality is signed as an empty field, so a URL signed
//! without `w` cannot be replayed with `w` added. The payload layout is a wire
//! format: changing field order, delimiter or the empty representation
//! invalidates every URL issued so far.

pub mod url_builder;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::ImageProxyConfig;
use crate::constants::PAYLOAD_DELIMITER;

pub use url_builder::{build_signed_url, build_src_set, UrlBuildError};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex encoded HMAC-SHA256 digest
const DIGEST_HEX_LEN: usize = 64;

/// Optional transform parameters covered by the signature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignOptions {
    pub width: Option<u32>,
    pub quality: Option<u8>,
}

impl SignOptions {
    pub fn new(width: Option<u32>, quality: Option<u8>) -> Self {
        Self { width, quality }
    }
}

/// Build the exact byte sequence that gets signed.
pub fn canonical_payload(url: &str, width: Option<u32>, quality: Option<u8>) -> String {
    let width = width.map(|w| w.to_string()).unwrap_or_default();
    let quality = quality.map(|q| q.to_string()).unwrap_or_default();

    let mut payload = String::with_capacity(url.len() + width.len() + quality.len() + 2);
    payload.push_str(url);
    payload.push(PAYLOAD_DELIMITER);
    payload.push_str(&width);
    payload.push(PAYLOAD_DELIMITER);
    payload.push_str(&quality);
    payload
}

/// Compute the lowercase hex signature for the given parameters.
pub fn sign(url: &str, width: Option<u32>, quality: Option<u8>, secret: &[u8]) -> String {
    let payload = canonical_payload(url, width, quality);
    let mac = keyed_mac(secret, &payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Sign with the secret held by `config`.
pub fn sign_with_config(url: &str, options: SignOptions, config: &ImageProxyConfig) -> String {
    sign(url, options.width, options.quality, config.secret_bytes())
}

/// Check `provided` against the signature expected for the given parameters.
///
/// Signatures of the wrong length are rejected before any comparison.
/// Malformed hex is a rejection, never a panic. The digest comparison
/// itself is constant time.
pub fn verify(
    url: &str,
    width: Option<u32>,
    quality: Option<u8>,
    provided: &str,
    secret: &[u8],
) -> bool {
    if provided.len() != DIGEST_HEX_LEN {
        return false;
    }

    let provided = match hex::decode(provided) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let payload = canonical_payload(url, width, quality);
    keyed_mac(secret, &payload).verify_slice(&provided).is_ok()
}

fn keyed_mac(secret: &[u8], payload: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    mac
}
