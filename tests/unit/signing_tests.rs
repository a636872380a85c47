// Signing and URL builder tests

use signed_image_proxy::config::ImageProxyConfig;
use signed_image_proxy::params::parse_and_verify;
use signed_image_proxy::signing::{
    build_signed_url, build_src_set, canonical_payload, sign, verify, SignOptions,
};
use std::collections::HashMap;
use url::Url;

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const SOURCE: &str = "https://example.com/a.jpg";

fn config() -> ImageProxyConfig {
    ImageProxyConfig::new(SECRET).unwrap()
}

#[test]
fn test_known_signature_vectors() {
    assert_eq!(
        sign(SOURCE, Some(640), Some(80), SECRET.as_bytes()),
        "315a4d0a23a19b0c4863f1301e159c82fc1d7e67551d8dd3541b4d1bfdd41e28"
    );
    assert_eq!(
        sign(SOURCE, None, None, SECRET.as_bytes()),
        "2074ed0c2b99133e0e11ed09c44e0dc63786130eb660a6281aa471654298b1c4"
    );
    assert_eq!(
        sign(SOURCE, Some(640), None, SECRET.as_bytes()),
        "1c81e50537436e8dbcd710365e4edb96ac222e00921072fd3ef5a01e6e05f842"
    );
}

#[test]
fn test_canonical_payload_layout() {
    assert_eq!(canonical_payload(SOURCE, Some(640), Some(80)), "https://example.com/a.jpg|640|80");
    assert_eq!(canonical_payload(SOURCE, None, Some(80)), "https://example.com/a.jpg||80");
}

#[test]
fn test_verify_rejects_any_parameter_change() {
    let sig = sign(SOURCE, Some(640), Some(80), SECRET.as_bytes());
    assert!(verify(SOURCE, Some(640), Some(80), &sig, SECRET.as_bytes()));
    assert!(!verify(SOURCE, Some(641), Some(80), &sig, SECRET.as_bytes()));
    assert!(!verify(SOURCE, Some(640), None, &sig, SECRET.as_bytes()));
    assert!(!verify("https://example.com/b.jpg", Some(640), Some(80), &sig, SECRET.as_bytes()));
    assert!(!verify(SOURCE, Some(640), Some(80), &sig, b"another-secret-another-secret-xx"));
}

#[test]
fn test_verify_rejects_malformed_signatures() {
    let sig = sign(SOURCE, None, None, SECRET.as_bytes());
    assert!(!verify(SOURCE, None, None, "", SECRET.as_bytes()));
    assert!(!verify(SOURCE, None, None, &sig[..63], SECRET.as_bytes()));
    assert!(!verify(SOURCE, None, None, &format!("{sig}0"), SECRET.as_bytes()));
    assert!(!verify(SOURCE, None, None, &"z".repeat(64), SECRET.as_bytes()));
}

#[test]
fn test_built_url_passes_param_validation() {
    let built = build_signed_url(
        "https://img.shop.test",
        "https://cdn.example/path/photo.jpg?v=3&x=y",
        SignOptions::new(Some(480), Some(70)),
        &config(),
    )
    .unwrap();

    let parsed = Url::parse(&built).unwrap();
    assert_eq!(parsed.path(), "/proxy");
    let mut query = HashMap::new();
    for (key, value) in parsed.query_pairs() {
        query.entry(key.into_owned()).or_insert(value.into_owned());
    }

    let params = parse_and_verify(&query, &config()).unwrap();
    assert_eq!(params.url, "https://cdn.example/path/photo.jpg?v=3&x=y");
    assert_eq!(params.width, Some(480));
    assert_eq!(params.quality, Some(70));
}

#[test]
fn test_src_set_uses_public_url_and_preserves_order() {
    let config = config().with_public_url("https://img.shop.test");
    let src_set = build_src_set(SOURCE, &[1024, 320, 320], Some(75), &config).unwrap();

    let entries: Vec<&str> = src_set.split(", ").collect();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].starts_with("https://img.shop.test/proxy?"));
    assert!(entries[0].ends_with(" 1024w"));
    assert!(entries[1].ends_with(" 320w"));
    assert_eq!(entries[1], entries[2]);
}

#[test]
fn test_src_set_empty_widths() {
    assert_eq!(build_src_set(SOURCE, &[], None, &config()).unwrap(), "");
}
