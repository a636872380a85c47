//! Image encoder abstraction
//!
//! Provides a trait-based encoder system that allows:
//! - One encoder per output format, selected by an exhaustive factory
//! - Consistent quality settings across formats
//! - Format-specific tuning (AVIF speed) kept out of the transform pipeline

use super::error::ImageError;
use super::format::OutputFormat;

/// Quality settings for image encoding
#[derive(Debug, Clone, Copy)]
pub struct EncoderQuality {
    /// Quality value (1-100, where 100 is best quality)
    pub quality: u8,
    /// Effort/speed trade-off (0-10, where 10 is slowest/best compression)
    pub effort: u8,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self {
            quality: 80,
            effort: 4,
        }
    }
}

impl EncoderQuality {
    /// Create quality settings with specified quality level
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            effort: 4,
        }
    }

    /// Set the encoding effort (speed vs compression trade-off)
    pub fn with_effort(mut self, effort: u8) -> Self {
        self.effort = effort.clamp(0, 10);
        self
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: OutputFormat,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        Self { data, format }
    }

    /// Content-Type header value
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Trait for image encoders
///
/// Implementations encode raw RGBA pixels (4 bytes per pixel) to a single
/// output format.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode raw RGBA image data to the target format
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError>;
}

/// JPEG encoder using the image crate
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        // JPEG has no alpha channel
        let rgb_data = rgba_to_rgb(data);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, quality.quality);

        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), OutputFormat::Jpeg))
    }
}

/// Lossy WebP encoder backed by libwebp
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::WebP
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        let encoder = webp::Encoder::from_rgba(data, width, height);
        let memory = encoder
            .encode_simple(false, quality.quality as f32)
            .map_err(|e| ImageError::encode_failed("webp", format!("{:?}", e)))?;

        Ok(EncodedImage::new(memory.to_vec(), OutputFormat::WebP))
    }
}

/// AVIF encoder backed by ravif
pub struct AvifEncoder;

impl AvifEncoder {
    /// Map effort (10 = best compression) onto ravif speed (1 = slowest)
    fn speed(quality: EncoderQuality) -> u8 {
        10u8.saturating_sub(quality.effort).clamp(1, 10)
    }
}

impl ImageEncoder for AvifEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Avif
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use imgref::Img;
        use rgb::FromSlice;

        let pixels = data.as_rgba();
        let encoded = ravif::Encoder::new()
            .with_quality(quality.quality as f32)
            .with_speed(Self::speed(quality))
            .encode_rgba(Img::new(pixels, width as usize, height as usize))
            .map_err(|e| ImageError::encode_failed("avif", e.to_string()))?;

        Ok(EncodedImage::new(encoded.avif_file, OutputFormat::Avif))
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified output format
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Avif => Box::new(AvifEncoder),
            OutputFormat::WebP => Box::new(WebPEncoder),
            OutputFormat::Jpeg => Box::new(JpegEncoder),
        }
    }
}

/// Convert RGBA to RGB by discarding alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }
    rgb
}
