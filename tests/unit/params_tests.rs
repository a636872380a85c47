// Parameter validation tests

use rstest::rstest;
use signed_image_proxy::config::ImageProxyConfig;
use signed_image_proxy::params::{parse_and_verify, ParamError};
use signed_image_proxy::signing::sign;
use std::collections::HashMap;

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const SOURCE: &str = "https://cdn.example/a.jpg";

fn config() -> ImageProxyConfig {
    ImageProxyConfig::new(SECRET).unwrap().with_max_width(2000)
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[rstest]
#[case("1", Some(1))]
#[case("2000", Some(2000))]
#[case("640", Some(640))]
fn test_width_in_bounds_accepted(#[case] raw: &str, #[case] expected: Option<u32>) {
    let sig = sign(SOURCE, expected, None, SECRET.as_bytes());
    let params =
        parse_and_verify(&query(&[("url", SOURCE), ("w", raw), ("sig", &sig)]), &config()).unwrap();
    assert_eq!(params.width, expected);
}

#[rstest]
#[case("0")]
#[case("2001")]
#[case("-5")]
#[case("abc")]
#[case("12.5")]
#[case(" 640")]
fn test_width_out_of_bounds_rejected(#[case] raw: &str) {
    let err = parse_and_verify(
        &query(&[("url", SOURCE), ("w", raw), ("sig", "deadbeef")]),
        &config(),
    )
    .unwrap_err();
    assert_eq!(err, ParamError::new("Invalid w: must be 1-2000", 400));
}

#[rstest]
#[case("1", Some(1))]
#[case("100", Some(100))]
fn test_quality_in_bounds_accepted(#[case] raw: &str, #[case] expected: Option<u8>) {
    let sig = sign(SOURCE, None, expected, SECRET.as_bytes());
    let params =
        parse_and_verify(&query(&[("url", SOURCE), ("q", raw), ("sig", &sig)]), &config()).unwrap();
    assert_eq!(params.quality, expected);
}

#[rstest]
#[case("0")]
#[case("101")]
#[case("255")]
#[case("high")]
fn test_quality_out_of_bounds_rejected(#[case] raw: &str) {
    let err = parse_and_verify(
        &query(&[("url", SOURCE), ("q", raw), ("sig", "deadbeef")]),
        &config(),
    )
    .unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.message, "Invalid q: must be 1-100");
}

#[rstest]
#[case(&[("sig", "x")], 400)]
#[case(&[("url", ""), ("sig", "x")], 400)]
#[case(&[("url", SOURCE)], 401)]
#[case(&[("url", SOURCE), ("sig", "  ")], 401)]
#[case(&[("url", SOURCE), ("sig", "x")], 403)]
fn test_status_codes(#[case] pairs: &[(&str, &str)], #[case] status: u16) {
    let err = parse_and_verify(&query(pairs), &config()).unwrap_err();
    assert_eq!(err.status, status);
}

#[test]
fn test_bounds_checked_before_signature() {
    // A bad width with a bad signature reports the width
    let err = parse_and_verify(
        &query(&[("url", SOURCE), ("w", "99999"), ("sig", "bad")]),
        &config(),
    )
    .unwrap_err();
    assert_eq!(err.status, 400);
}

#[test]
fn test_signature_from_other_secret_rejected() {
    let sig = sign(SOURCE, None, None, b"ffffffffffffffffffffffffffffffff");
    let err = parse_and_verify(&query(&[("url", SOURCE), ("sig", &sig)]), &config()).unwrap_err();
    assert_eq!(err, ParamError::new("Invalid signature", 403));
}
