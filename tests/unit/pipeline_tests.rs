// End-to-end transform pipeline tests with a stub source fetcher

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use signed_image_proxy::config::{ImageProxyConfig, StaticConfigProvider};
use signed_image_proxy::fetch::{FetchError, SourceFetcher};
use signed_image_proxy::image::ImageProcessor;
use signed_image_proxy::pipeline::{ProxyResponse, TransformPipeline};
use signed_image_proxy::signing::sign;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const SOURCE: &str = "https://img.example.com/photo.jpg";

/// Serves a fixed body for every URL
struct FixedFetcher(Bytes);

#[async_trait]
impl SourceFetcher for FixedFetcher {
    async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
        Ok(self.0.clone())
    }
}

fn jpeg(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageOutputFormat::Jpeg(85))
        .unwrap();
    Bytes::from(buffer.into_inner())
}

fn pipeline(config: ImageProxyConfig, source: Bytes) -> TransformPipeline {
    TransformPipeline::new(
        Arc::new(StaticConfigProvider::new(config)),
        Arc::new(FixedFetcher(source)),
        Arc::new(ImageProcessor::default()),
    )
}

fn signed_query(width: Option<u32>, quality: Option<u8>) -> HashMap<String, String> {
    let mut query = HashMap::new();
    query.insert("url".to_string(), SOURCE.to_string());
    if let Some(w) = width {
        query.insert("w".to_string(), w.to_string());
    }
    if let Some(q) = quality {
        query.insert("q".to_string(), q.to_string());
    }
    query.insert("sig".to_string(), sign(SOURCE, width, quality, SECRET.as_bytes()));
    query
}

fn config() -> ImageProxyConfig {
    ImageProxyConfig::new(SECRET).unwrap()
}

fn assert_cacheable(response: &ProxyResponse, max_age: u64) {
    let swr = max_age.min(86_400);
    assert_eq!(
        response.header("Cache-Control").unwrap(),
        format!("public, max-age={max_age}, s-maxage={max_age}, stale-while-revalidate={swr}")
    );
    assert_eq!(response.header("Vary"), Some("Accept"));
    assert_eq!(
        response.header("Content-Length").unwrap(),
        response.body.len().to_string()
    );
}

#[tokio::test]
async fn test_webp_resize_end_to_end() {
    let pipeline = pipeline(config(), jpeg(800, 600));

    let response = pipeline
        .handle(&signed_query(Some(640), None), Some("image/webp,*/*"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/webp"));
    assert_cacheable(&response, 31_536_000);

    let decoded = webp::Decoder::new(&response.body).decode().unwrap();
    assert_eq!(decoded.width(), 640);
    assert_eq!(decoded.height(), 480);
}

#[tokio::test]
async fn test_jpeg_fallback_never_upscales() {
    let pipeline = pipeline(config().with_cache_max_age(600), jpeg(400, 300));

    let response = pipeline.handle(&signed_query(None, Some(60)), None).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_cacheable(&response, 600);

    let decoded = image::load_from_memory(&response.body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 300));
}

#[tokio::test]
async fn test_avif_preferred_when_accepted() {
    let pipeline = pipeline(config(), jpeg(64, 48));

    let response = pipeline
        .handle(&signed_query(Some(32), Some(50)), Some("image/avif,image/webp"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/avif"));
    assert_eq!(&response.body[4..8], b"ftyp");
}

#[tokio::test]
async fn test_missing_secret_is_500_json() {
    let error = ImageProxyConfig::from_lookup(|_| None).unwrap_err();
    let pipeline = TransformPipeline::new(
        Arc::new(StaticConfigProvider::failing(error)),
        Arc::new(FixedFetcher(jpeg(8, 8))),
        Arc::new(ImageProcessor::default()),
    );

    let response = pipeline.handle(&signed_query(None, None), None).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.header("Cache-Control"), Some("no-store"));
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("IMAGE_PROXY_SECRET must be set"));
}

#[tokio::test]
async fn test_undecodable_source_is_500() {
    let pipeline = pipeline(config(), Bytes::from_static(b"<html>not an image</html>"));
    let response = pipeline.handle(&signed_query(None, None), None).await;
    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_width_above_configured_max_rejected() {
    let pipeline = pipeline(config().with_max_width(500), jpeg(8, 8));
    let response = pipeline.handle(&signed_query(Some(640), None), None).await;
    assert_eq!(response.status, 400);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["error"], "Invalid w: must be 1-500");
}

#[tokio::test]
async fn test_subdomain_of_allowed_origin_served() {
    let pipeline = pipeline(config().with_allowed_origins(["example.com"]), jpeg(16, 16));
    let response = pipeline.handle(&signed_query(None, None), None).await;
    assert_eq!(response.status, 200);
}
