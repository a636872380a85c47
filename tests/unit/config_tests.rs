// Configuration tests

use rstest::rstest;
use signed_image_proxy::config::{
    ConfigError, ConfigProvider, EnvConfigProvider, ImageProxyConfig, LogFormat, ServerConfig,
};
use signed_image_proxy::constants::*;
use std::collections::HashMap;
use std::time::Duration;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn resolve(pairs: &[(&str, &str)]) -> Result<ImageProxyConfig, ConfigError> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ImageProxyConfig::from_lookup(|key| map.get(key).cloned())
}

#[rstest]
#[case("", 4096)]
#[case("1024", 1024)]
#[case(" 2048 ", 2048)]
#[case("0", 1)]
#[case("8192", 8192)]
#[case("8193", 8192)]
#[case("1e3", 4096)]
fn test_max_width_resolution(#[case] raw: &str, #[case] expected: u32) {
    let config = resolve(&[(ENV_SECRET, SECRET), (ENV_MAX_WIDTH, raw)]).unwrap();
    assert_eq!(config.max_width, expected);
}

#[rstest]
#[case("3600", 3600)]
#[case("0", 0)]
#[case("-1", 0)]
#[case("soon", 31_536_000)]
fn test_cache_max_age_resolution(#[case] raw: &str, #[case] expected: u64) {
    let config = resolve(&[(ENV_SECRET, SECRET), (ENV_CACHE_MAX_AGE, raw)]).unwrap();
    assert_eq!(config.cache_max_age, expected);
}

#[rstest]
#[case("")]
#[case("short")]
#[case("0123456789abcdef0123456789abcde")]
fn test_insufficient_secret(#[case] secret: &str) {
    let err = resolve(&[(ENV_SECRET, secret)]).unwrap_err();
    assert_eq!(err, ConfigError::InvalidSecret);
    assert!(err.to_string().contains("IMAGE_PROXY_SECRET"));
}

#[test]
fn test_secret_length_counts_characters() {
    // 32 multi-byte characters
    assert!(ImageProxyConfig::new("é".repeat(32)).is_ok());
    assert!(ImageProxyConfig::new("é".repeat(31)).is_err());
}

#[test]
fn test_public_url_override() {
    let config = resolve(&[(ENV_SECRET, SECRET), (ENV_PUBLIC_URL, " https://img.shop.test ")]).unwrap();
    assert_eq!(config.public_url, "https://img.shop.test");
}

#[test]
fn test_env_provider_reads_process_environment() {
    std::env::set_var(ENV_SECRET, SECRET);
    std::env::set_var(ENV_ALLOWED_ORIGINS, "example.com");
    std::env::set_var(ENV_MAX_WIDTH, "1500");

    let config = EnvConfigProvider.resolve().unwrap();
    assert_eq!(config.allowed_origins, Some(vec!["example.com".to_string()]));
    assert_eq!(config.max_width, 1500);
    assert_eq!(config.secret_bytes(), SECRET.as_bytes());

    std::env::remove_var(ENV_SECRET);
    std::env::remove_var(ENV_ALLOWED_ORIGINS);
    std::env::remove_var(ENV_MAX_WIDTH);
}

#[test]
fn test_server_config_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    assert_eq!(config.threads, 4);
    assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    assert!(!config.coalesce);
    assert_eq!(config.log_format, LogFormat::Json);
}
