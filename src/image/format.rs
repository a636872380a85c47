//! Output format negotiation based on the Accept header
//!
//! Selection is a fixed priority over substring matches of the lowercased
//! header: AVIF, then WebP, then JPEG as the universal fallback. Quality
//! values (`;q=`) are deliberately not interpreted.

use std::fmt;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Avif,
    WebP,
    Jpeg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::WebP => "webp",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::WebP => "image/webp",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the output format for an Accept header value.
pub fn negotiate_format(accept_header: Option<&str>) -> OutputFormat {
    let accept = accept_header.unwrap_or_default().to_lowercase();

    if accept.contains("image/avif") {
        OutputFormat::Avif
    } else if accept.contains("image/webp") {
        OutputFormat::WebP
    } else {
        OutputFormat::Jpeg
    }
}

/// Get the Vary header value for negotiated responses
pub fn vary_header() -> &'static str {
    "Accept"
}
