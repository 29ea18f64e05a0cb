//! Pure Rust image processing backend (plus libwebp for lossy WebP).
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF) | `image::ImageReader` with content sniffing |
//! | Compose | `image::imageops::resize`, then an integer blend onto white |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `webp::Encoder::encode_advanced` (lossy, method 6) |

use super::backend::{BackendError, Dimensions, ImageBackend, PixelSurface};
use super::params::{OutputFormat, Quality, Resample};
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{
    ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, Rgba, RgbImage, RgbaImage, imageops,
};
use std::io::Cursor;
use tracing::debug;

/// Source MIME types the rasterizer accepts.
pub const SUPPORTED_INPUT_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Background every composite is flattened onto.
pub const BACKGROUND: [u8; 4] = [255, 255, 255, 255];

const SVG_MIME: &str = "image/svg+xml";

/// Returns true when `mime` is one of [`SUPPORTED_INPUT_MIME_TYPES`].
pub fn is_supported_input(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    SUPPORTED_INPUT_MIME_TYPES.contains(&mime.as_str())
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate the declared type and pick a format hint for the decoder.
fn format_hint(declared_mime: &str) -> Result<ImageFormat, BackendError> {
    let mime = declared_mime.trim().to_ascii_lowercase();
    if mime == SVG_MIME {
        return Err(BackendError::Decode(
            "SVG is vector content and cannot be rasterized".into(),
        ));
    }
    if !is_supported_input(&mime) {
        return Err(BackendError::Decode(format!(
            "Unsupported source type: {declared_mime}"
        )));
    }
    ImageFormat::from_mime_type(&mime)
        .ok_or_else(|| BackendError::Decode(format!("Unsupported source type: {declared_mime}")))
}

fn encode_jpeg(rgb: &RgbImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.value() as u8);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
    Ok(buffer)
}

fn encode_png(rgb: &RgbImage) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))?;
    Ok(buffer)
}

fn encode_webp(rgb: &RgbImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| BackendError::Encode("WebP config init failed".into()))?;
    config.lossless = 0;
    config.quality = quality.factor() * 100.0;
    // Slowest method, best rate-distortion.
    config.method = 6;
    config.use_sharp_yuv = 1;

    let memory = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
        .encode_advanced(&config)
        .map_err(|e| BackendError::Encode(format!("WebP encode failed: {e:?}")))?;
    Ok(memory.to_vec())
}

/// Blend `pixels` over [`BACKGROUND`]. Every output pixel has alpha 255.
///
/// Integer blend, rounded: `out = (c * a + bg * (255 - a)) / 255`.
fn flatten_onto_background(pixels: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let Rgba([r, g, b, a]) = *pixels.get_pixel(x, y);
        let a = u32::from(a);
        let blend = |c: u8, bg: u8| {
            ((u32::from(c) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8
        };
        Rgba([
            blend(r, BACKGROUND[0]),
            blend(g, BACKGROUND[1]),
            blend(b, BACKGROUND[2]),
            u8::MAX,
        ])
    })
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], declared_mime: &str) -> Result<PixelSurface, BackendError> {
        if bytes.is_empty() {
            return Err(BackendError::Decode("Empty payload".into()));
        }
        let hint = format_hint(declared_mime)?;

        // The reader borrows `bytes` and is dropped at the end of this scope
        // on both the success and the error path.
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("Failed to read payload: {}", e)))?;
        if reader.format().is_none() {
            reader.set_format(hint);
        }
        let detected = reader.format();

        let img = reader
            .decode()
            .map_err(|e| BackendError::Decode(format!("Failed to decode {declared_mime}: {}", e)))?;

        debug!(
            declared = declared_mime,
            detected = ?detected,
            width = img.width(),
            height = img.height(),
            "decoded source"
        );
        Ok(PixelSurface::from_rgba(img.to_rgba8()))
    }

    fn compose(
        &self,
        surface: &PixelSurface,
        target: Dimensions,
        filter: Resample,
    ) -> Result<PixelSurface, BackendError> {
        if target.is_empty() {
            return Err(BackendError::InvalidDimensions {
                width: target.width,
                height: target.height,
            });
        }

        if surface.dimensions() == target {
            return Ok(PixelSurface::from_rgba(flatten_onto_background(
                surface.as_rgba(),
            )));
        }
        let scaled = imageops::resize(
            surface.as_rgba(),
            target.width,
            target.height,
            filter.filter_type(),
        );
        Ok(PixelSurface::from_rgba(flatten_onto_background(&scaled)))
    }

    fn encode(
        &self,
        surface: &PixelSurface,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        if surface.dimensions().is_empty() {
            return Err(BackendError::Encode(format!(
                "Cannot encode a zero-area surface ({})",
                surface.dimensions()
            )));
        }

        // Composites are opaque, so alpha carries nothing worth storing.
        let rgb: RgbImage = surface.as_rgba().convert();
        match format {
            OutputFormat::Jpeg => encode_jpeg(&rgb, quality),
            OutputFormat::Png => encode_png(&rgb),
            OutputFormat::Webp => encode_webp(&rgb, quality),
        }
    }
}
