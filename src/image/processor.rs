//! Image processing implementation
//!
//! Handles the actual image transformation: probe → decode → resize → encode.
//! Images are never upscaled: if the probed natural width already fits the
//! target the source is re-encoded at its natural size, and the resize step
//! refuses to enlarge even when the probe was inconclusive.

use bytes::Bytes;
use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::encoder::{EncoderFactory, EncoderQuality};
use super::error::ImageError;
use super::format::OutputFormat;
use crate::constants::DEFAULT_MAX_SOURCE_PIXELS;

/// What the caller wants out of a transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub format: OutputFormat,
    /// Desired output width; `None` keeps the natural width
    pub target_width: Option<u32>,
    pub quality: u8,
}

/// Result of image processing
#[derive(Debug, Clone)]
pub struct TranscodedImage {
    /// The encoded image data; cloning shares the buffer
    pub data: Bytes,
    pub format: OutputFormat,
    /// Source dimensions (width, height)
    pub natural_size: (u32, u32),
    /// Output dimensions (width, height)
    pub output_size: (u32, u32),
}

impl TranscodedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn was_resized(&self) -> bool {
        self.natural_size != self.output_size
    }
}

/// Capability: turn source bytes into an encoded image of the requested shape.
pub trait ImageTranscoder: Send + Sync {
    fn transcode(
        &self,
        source: &[u8],
        request: &TranscodeRequest,
    ) -> Result<TranscodedImage, ImageError>;
}

/// Default transcoder built on `image`, `fast_image_resize`, libwebp and ravif
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    /// Image bomb guard, checked before full decode
    max_source_pixels: u64,
    /// Encoder effort (0-10)
    effort: u8,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self {
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
            effort: EncoderQuality::default().effort,
        }
    }
}

impl ImageProcessor {
    pub fn new(max_source_pixels: u64) -> Self {
        Self {
            max_source_pixels,
            ..Default::default()
        }
    }

    pub fn with_effort(mut self, effort: u8) -> Self {
        self.effort = effort.clamp(0, 10);
        self
    }
}

impl ImageTranscoder for ImageProcessor {
    fn transcode(
        &self,
        source: &[u8],
        request: &TranscodeRequest,
    ) -> Result<TranscodedImage, ImageError> {
        // 1. Learn the natural size from the header only
        let probed = probe_dimensions(source);
        if let Some((width, height)) = probed {
            validate_dimensions(width, height, self.max_source_pixels)?;
        }
        let planned_width = plan_resize(probed.map(|(w, _)| w), request.target_width);

        // 2. Decode
        let img = decode_image(source)?;
        let natural_size = (img.width(), img.height());

        // 3. Resize, never enlarging
        let processed = match planned_width.filter(|&w| w < natural_size.0) {
            Some(width) => {
                let height = scaled_height(natural_size.0, natural_size.1, width);
                resize_image(&img, width, height)?
            }
            None => img,
        };
        let output_size = (processed.width(), processed.height());

        // 4. Encode
        let quality = EncoderQuality::with_quality(request.quality).with_effort(self.effort);
        let encoder = EncoderFactory::create(request.format);
        let rgba_data = processed.to_rgba8().into_raw();
        let encoded = encoder.encode(&rgba_data, output_size.0, output_size.1, quality)?;

        Ok(TranscodedImage {
            data: Bytes::from(encoded.data),
            format: encoded.format,
            natural_size,
            output_size,
        })
    }
}

/// Read width and height from the image header without decoding pixels
pub fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Decide the width to resize to, or `None` to keep the natural size.
///
/// A known natural width at or below the target skips resizing. An unknown
/// natural width still plans a resize; the resize step guards enlargement.
pub fn plan_resize(natural_width: Option<u32>, target_width: Option<u32>) -> Option<u32> {
    let target = target_width?;
    match natural_width {
        Some(natural) if natural <= target => None,
        _ => Some(target),
    }
}

/// Height preserving the aspect ratio for `target_width`, rounded, at least 1
fn scaled_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    if src_width == 0 {
        return src_height.max(1);
    }
    let scaled = (src_height as u64 * target_width as u64 + src_width as u64 / 2) / src_width as u64;
    scaled.max(1) as u32
}

/// Reject sources whose pixel count exceeds the limit
fn validate_dimensions(width: u32, height: u32, max_pixels: u64) -> Result<(), ImageError> {
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(ImageError::image_bomb(width, height, max_pixels));
    }
    Ok(())
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8]) -> Result<DynamicImage, ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, ImageError> {
    let src_width =
        NonZeroU32::new(img.width()).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
