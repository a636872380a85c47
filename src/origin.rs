//! Source origin allowlist

use url::Url;

use crate::config::ImageProxyConfig;

/// Decide whether `source_url` may be fetched.
///
/// With no allowlist configured every origin is allowed. Otherwise the
/// lowercased hostname must equal an entry or be a subdomain of one
/// (`img.example.com` matches `example.com`, `evilexample.com` does not).
/// Ports are ignored. URLs that fail to parse, or carry no host, are denied.
pub fn is_origin_allowed(source_url: &str, config: &ImageProxyConfig) -> bool {
    let allowlist = match &config.allowed_origins {
        Some(list) if !list.is_empty() => list,
        _ => return true,
    };

    let host = match Url::parse(source_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
    {
        Some(host) => host,
        None => return false,
    };

    allowlist.iter().any(|allowed| host_matches(&host, allowed))
}

fn host_matches(host: &str, allowed: &str) -> bool {
    host == allowed
        || host
            .strip_suffix(allowed)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
