//! Shared test utilities for the imgpress test suite.
//!
//! Every fixture is synthesized in memory with the `image` encoders, so
//! tests never depend on files checked into the repository.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let jpeg = gradient_jpeg(400, 300);
//! let png = translucent_png(64, 64);
//! let source = source_image("photo.jpg", jpeg);
//! ```

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

use crate::types::SourceImage;

// =========================================================================
// Encoded fixtures
// =========================================================================

/// A smooth RGB gradient encoded as JPEG (quality 90).
pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

/// RGBA PNG whose left half is fully transparent and right half is
/// half-transparent red.
pub fn translucent_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([255, 0, 0, 128])
        }
    });
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    buffer
}

/// Single-frame GIF whose left half is transparent and right half is
/// opaque blue.
pub fn half_transparent_gif(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let mut buffer = Vec::new();
    {
        // The GIF trailer is written when the encoder drops.
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder
            .encode(img.as_raw(), width, height, ExtendedColorType::Rgba8)
            .unwrap();
    }
    buffer
}

/// The same gradient as [`gradient_jpeg`], encoded as lossless WebP so
/// decoded pixels can be compared exactly.
pub fn gradient_webp(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    buffer
}

// =========================================================================
// Source helpers
// =========================================================================

/// Wrap bytes in a [`SourceImage`], deriving the MIME type from the name.
pub fn source_image(filename: &str, bytes: Vec<u8>) -> SourceImage {
    let mime = crate::types::mime_from_filename(filename);
    SourceImage::new(bytes, mime, filename)
}

/// Decode an output payload and return its dimensions. Panics on failure.
pub fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes)
        .unwrap_or_else(|e| panic!("output is not a decodable image: {e}"));
    (img.width(), img.height())
}
