// Configuration module
//
// Image proxy settings come from the environment and are resolved through a
// `ConfigProvider`, so the request handler can re-read them on every call and
// tests can inject values without touching the process environment.

pub mod server;

use secrecy::{ExposeSecret, Secret};

use crate::constants::{
    DEFAULT_CACHE_MAX_AGE, DEFAULT_MAX_WIDTH, DEFAULT_PUBLIC_URL, ENV_ALLOWED_ORIGINS,
    ENV_CACHE_MAX_AGE, ENV_MAX_WIDTH, ENV_PUBLIC_URL, ENV_SECRET, MAX_WIDTH_CEILING,
    MIN_SECRET_LENGTH,
};

pub use server::{LogFormat, ServerConfig};

/// Fatal configuration problems. Surfaced to clients as 500.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "IMAGE_PROXY_SECRET must be set and at least 32 characters. Use: openssl rand -hex 32"
    )]
    InvalidSecret,
}

/// Resolved image proxy configuration
#[derive(Debug, Clone)]
pub struct ImageProxyConfig {
    /// HMAC key; never logged
    secret: Secret<String>,
    /// `None` means every origin is allowed
    pub allowed_origins: Option<Vec<String>>,
    /// Largest accepted `w`, always within [1, 8192]
    pub max_width: u32,
    /// Seconds used for max-age and s-maxage
    pub cache_max_age: u64,
    /// Origin prepended to generated proxy URLs
    pub public_url: String,
}

impl ImageProxyConfig {
    /// Create a config with default limits.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSecret` if the secret is shorter than
    /// 32 characters.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidSecret);
        }

        Ok(Self {
            secret: Secret::new(secret),
            allowed_origins: None,
            max_width: DEFAULT_MAX_WIDTH,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
        })
    }

    /// Restrict sources to the given hostnames (entries are trimmed and lowercased).
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_origins = normalize_origins(origins);
        self
    }

    /// Set the maximum width, clamped to [1, 8192].
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width.clamp(1, MAX_WIDTH_CEILING);
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u64) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into();
        self
    }

    /// Raw key material for HMAC
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }

    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    ///
    /// Absent or unparseable numbers fall back to their defaults; parseable
    /// numbers are clamped into range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(ENV_SECRET).ok_or(ConfigError::InvalidSecret)?;
        let mut config = Self::new(secret)?;

        config.allowed_origins = lookup(ENV_ALLOWED_ORIGINS)
            .and_then(|raw| normalize_origins(raw.split(',')));

        config.max_width = parse_int(lookup(ENV_MAX_WIDTH).as_deref())
            .map(|value| value.clamp(1, MAX_WIDTH_CEILING as i64) as u32)
            .unwrap_or(DEFAULT_MAX_WIDTH);

        config.cache_max_age = parse_int(lookup(ENV_CACHE_MAX_AGE).as_deref())
            .map(|value| value.max(0) as u64)
            .unwrap_or(DEFAULT_CACHE_MAX_AGE);

        if let Some(url) = lookup(ENV_PUBLIC_URL).filter(|url| !url.trim().is_empty()) {
            config.public_url = url.trim().to_string();
        }

        Ok(config)
    }

    /// Settings that resolve fine but are almost certainly operator mistakes
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.max_width == 1 {
            warnings.push("IMAGE_PROXY_MAX_WIDTH resolved to 1; every width above 1 will be rejected");
        }
        if self.cache_max_age == 0 {
            warnings.push("IMAGE_PROXY_CACHE_MAX_AGE is 0; transformed images will not be cached");
        }
        warnings
    }
}

/// Lowercase and trim entries, dropping blanks. An empty result means unrestricted.
fn normalize_origins<I, S>(origins: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let origins: Vec<String> = origins
        .into_iter()
        .map(|origin| origin.as_ref().trim().to_lowercase())
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() {
        None
    } else {
        Some(origins)
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
}

/// Source of image proxy configuration for the request handler
pub trait ConfigProvider: Send + Sync {
    fn resolve(&self) -> Result<ImageProxyConfig, ConfigError>;
}

/// Reads the environment on every call so changes apply without a restart
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigProvider;

impl ConfigProvider for EnvConfigProvider {
    fn resolve(&self) -> Result<ImageProxyConfig, ConfigError> {
        ImageProxyConfig::from_env()
    }
}

/// Always yields the same resolution result
#[derive(Debug, Clone)]
pub struct StaticConfigProvider {
    resolved: Result<ImageProxyConfig, ConfigError>,
}

impl StaticConfigProvider {
    pub fn new(config: ImageProxyConfig) -> Self {
        Self {
            resolved: Ok(config),
        }
    }

    /// A provider whose every resolution fails with `error`
    pub fn failing(error: ConfigError) -> Self {
        Self {
            resolved: Err(error),
        }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn resolve(&self) -> Result<ImageProxyConfig, ConfigError> {
        self.resolved.clone()
    }
}
