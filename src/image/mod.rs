//! Image transformation module
//!
//! Provides the transform half of the proxy:
//! - Output format negotiation from the Accept header
//! - Probe, width-only resize (never upscaling) and re-encode
//! - Encoders for AVIF, WebP and JPEG
//!
//! The transcoder is a trait so the request pipeline can run against a stub
//! in tests.

pub mod encoder;
pub mod error;
pub mod format;
pub mod processor;

pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::ImageError;
pub use format::{negotiate_format, vary_header, OutputFormat};
pub use processor::{
    plan_resize, probe_dimensions, ImageProcessor, ImageTranscoder, TranscodeRequest,
    TranscodedImage,
};
