// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Environment variables
// =============================================================================

/// HMAC secret used to sign and verify proxy URLs (required)
pub const ENV_SECRET: &str = "IMAGE_PROXY_SECRET";

/// Comma-separated list of allowed source hostnames (optional)
pub const ENV_ALLOWED_ORIGINS: &str = "IMAGE_PROXY_ALLOWED_ORIGINS";

/// Maximum accepted `w` parameter (optional)
pub const ENV_MAX_WIDTH: &str = "IMAGE_PROXY_MAX_WIDTH";

/// Cache-Control max-age in seconds (optional)
pub const ENV_CACHE_MAX_AGE: &str = "IMAGE_PROXY_CACHE_MAX_AGE";

/// Public origin of this proxy, used when building signed URLs (optional)
pub const ENV_PUBLIC_URL: &str = "IMAGE_PROXY_PUBLIC_URL";

// =============================================================================
// Signing defaults
// =============================================================================

/// Minimum secret length in characters
pub const MIN_SECRET_LENGTH: usize = 32;

/// Separator between canonical payload fields. Changing it invalidates every issued URL.
pub const PAYLOAD_DELIMITER: char = '|';

/// Query parameter carrying the signature
pub const SIG_PARAM: &str = "sig";

/// Query parameter carrying the source URL
pub const URL_PARAM: &str = "url";

/// Query parameter carrying the target width
pub const WIDTH_PARAM: &str = "w";

/// Query parameter carrying the output quality
pub const QUALITY_PARAM: &str = "q";

// =============================================================================
// Image defaults
// =============================================================================

/// Default maximum width accepted in `w`
pub const DEFAULT_MAX_WIDTH: u32 = 4096;

/// Hard ceiling for the configurable maximum width
pub const MAX_WIDTH_CEILING: u32 = 8192;

/// Target width used when the request carries no `w`
pub const DEFAULT_TARGET_WIDTH: u32 = 1200;

/// Encoder quality used when the request carries no `q`
pub const DEFAULT_QUALITY: u8 = 80;

/// Highest accepted `q` value
pub const MAX_QUALITY: u8 = 100;

/// Maximum source image pixels (width * height) before decoding is refused
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 100_000_000;

// =============================================================================
// Cache header defaults
// =============================================================================

/// Default Cache-Control max-age (1 year)
pub const DEFAULT_CACHE_MAX_AGE: u64 = 31_536_000;

/// Upper bound for stale-while-revalidate (1 day)
pub const MAX_STALE_WHILE_REVALIDATE: u64 = 86_400;

// =============================================================================
// Server defaults
// =============================================================================

/// Path served by the transform endpoint
pub const PROXY_PATH: &str = "/proxy";

/// Health check path
pub const HEALTH_PATH: &str = "/health";

/// Prometheus metrics path
pub const METRICS_PATH: &str = "/metrics";

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

/// Default public base URL for signed URL generation
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

// =============================================================================
// Upstream fetch defaults
// =============================================================================

/// Default upstream fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default maximum source image size (50 MB)
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 50 * 1024 * 1024;

/// Maximum redirect hops followed on the source host
pub const MAX_FETCH_REDIRECTS: usize = 5;

/// User-Agent sent with upstream fetches
pub const USER_AGENT: &str = concat!("signed-image-proxy/", env!("CARGO_PKG_VERSION"));
