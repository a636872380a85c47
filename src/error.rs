// Error types module

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::image::ImageError;
use crate::params::ParamError;

/// Centralized error type for the proxy
///
/// Every failure on the request path ends up here so the handler can map it
/// to exactly one HTTP status and a JSON error body. Errors are terminal for
/// the request; nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// Configuration errors (missing or short secret)
    #[error("{0}")]
    Config(String),

    /// Malformed or missing request parameters (400 or 401)
    #[error("{message}")]
    Validation { message: String, status: u16 },

    /// Bad signature or disallowed origin
    #[error("{0}")]
    Auth(String),

    /// Source fetch failed or upstream answered with a non-success status
    #[error("{0}")]
    Upstream(String),

    /// Decode, resize or encode failed
    #[error("{0}")]
    Transform(String),
}

impl ProxyError {
    /// HTTP status code for this error
    pub fn status(&self) -> u16 {
        match self {
            ProxyError::Config(_) => 500,
            ProxyError::Validation { status, .. } => *status,
            ProxyError::Auth(_) => 403,
            ProxyError::Upstream(_) => 502,
            ProxyError::Transform(_) => 500,
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Config(_) => "config",
            ProxyError::Validation { .. } => "validation",
            ProxyError::Auth(_) => "auth",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::Transform(_) => "transform",
        }
    }
}

impl From<ConfigError> for ProxyError {
    fn from(err: ConfigError) -> Self {
        ProxyError::Config(err.to_string())
    }
}

impl From<ParamError> for ProxyError {
    fn from(err: ParamError) -> Self {
        if err.status == 403 {
            ProxyError::Auth(err.message)
        } else {
            ProxyError::Validation {
                message: err.message,
                status: err.status,
            }
        }
    }
}

impl From<FetchError> for ProxyError {
    fn from(err: FetchError) -> Self {
        ProxyError::Upstream(err.to_string())
    }
}

impl From<ImageError> for ProxyError {
    fn from(err: ImageError) -> Self {
        ProxyError::Transform(err.to_string())
    }
}
