//! Signed proxy URL construction.
//!
//! Query parameter order does not matter for verification: the handler
//! re-derives the canonical payload from the parsed values.

use url::Url;

use super::{sign_with_config, SignOptions};
use crate::config::ImageProxyConfig;
use crate::constants::{PROXY_PATH, QUALITY_PARAM, SIG_PARAM, URL_PARAM, WIDTH_PARAM};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlBuildError {
    #[error("Invalid base URL '{base}': {reason}")]
    InvalidBase { base: String, reason: String },
}

/// Compose `<base_url>/proxy?url=..[&w=..][&q=..]&sig=..`.
///
/// # Errors
///
/// Returns `UrlBuildError::InvalidBase` if `base_url` is not an absolute URL.
pub fn build_signed_url(
    base_url: &str,
    source_url: &str,
    options: SignOptions,
    config: &ImageProxyConfig,
) -> Result<String, UrlBuildError> {
    let signature = sign_with_config(source_url, options, config);

    let mut url = Url::parse(base_url)
        .and_then(|base| base.join(PROXY_PATH))
        .map_err(|e| UrlBuildError::InvalidBase {
            base: base_url.to_string(),
            reason: e.to_string(),
        })?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair(URL_PARAM, source_url);
        if let Some(width) = options.width {
            query.append_pair(WIDTH_PARAM, &width.to_string());
        }
        if let Some(quality) = options.quality {
            query.append_pair(QUALITY_PARAM, &quality.to_string());
        }
        query.append_pair(SIG_PARAM, &signature);
    }

    Ok(url.into())
}

/// Build a responsive `srcset` value: `"<url> <w>w, <url> <w>w, ..."`.
///
/// Widths are emitted in the given order without de-duplication. URLs are
/// rooted at the configured public URL.
pub fn build_src_set(
    source_url: &str,
    widths: &[u32],
    quality: Option<u8>,
    config: &ImageProxyConfig,
) -> Result<String, UrlBuildError> {
    let entries = widths
        .iter()
        .map(|&width| {
            let options = SignOptions::new(Some(width), quality);
            build_signed_url(&config.public_url, source_url, options, config)
                .map(|url| format!("{url} {width}w"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries.join(", "))
}
