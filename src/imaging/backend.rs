//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three pixel operations every backend
//! must support: decode, compose, and encode. Dimension planning is not part of
//! the trait; it is pure math and lives in [`calculations`](super::calculations).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Output bytes are
//! deterministic for a given backend but may differ between backends.

use super::params::{OutputFormat, Quality, Resample};
use image::{Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Invalid target dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A decoded RGBA pixel grid.
///
/// Owned by exactly one pipeline run; dropping it frees the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSurface {
    pixels: RgbaImage,
}

impl PixelSurface {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// A surface filled with one color.
    pub fn filled(dims: Dimensions, rgba: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(dims.width, dims.height, Rgba(rgba)),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    /// True when no pixel has any transparency.
    pub fn is_opaque(&self) -> bool {
        self.pixels.pixels().all(|p| p.0[3] == u8::MAX)
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the pipeline in
/// [`operations`](super::operations) stays backend-agnostic.
pub trait ImageBackend: Send + Sync {
    /// Decode an encoded payload into pixels. `declared_mime` is the type the
    /// caller claims; backends sniff the bytes and use it as a fallback.
    fn decode(&self, bytes: &[u8], declared_mime: &str) -> Result<PixelSurface, BackendError>;

    /// Draw `surface` scaled to `target` over an opaque white background.
    fn compose(
        &self,
        surface: &PixelSurface,
        target: Dimensions,
        filter: Resample,
    ) -> Result<PixelSurface, BackendError>;

    /// Serialize a surface.
    fn encode(
        &self,
        surface: &PixelSurface,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}

/// Encode with the format given as a string (`"jpeg"`, `"image/webp"`, ...).
///
/// Unknown formats fail with [`BackendError::UnsupportedFormat`] before the
/// backend is touched. Quality is clamped to 1–100.
pub fn encode_str(
    backend: &impl ImageBackend,
    surface: &PixelSurface,
    format: &str,
    quality: u32,
) -> Result<Vec<u8>, BackendError> {
    let format = OutputFormat::parse(format)?;
    backend.encode(surface, format, Quality::new(quality))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without doing pixel work.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
        /// When set, `encode` fails with this message.
        pub encode_failure: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode {
            len: usize,
            mime: String,
        },
        Compose {
            width: u32,
            height: u32,
            filter: Resample,
        },
        Encode {
            width: u32,
            height: u32,
            format: OutputFormat,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                decode_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn failing_encode(dims: Dimensions, message: &str) -> Self {
            Self {
                decode_results: Mutex::new(vec![dims]),
                encode_failure: Some(message.to_string()),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8], declared_mime: &str) -> Result<PixelSurface, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Decode {
                len: bytes.len(),
                mime: declared_mime.to_string(),
            });

            let dims = self
                .decode_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))?;
            Ok(PixelSurface::filled(dims, [0, 0, 0, 0]))
        }

        fn compose(
            &self,
            _surface: &PixelSurface,
            target: Dimensions,
            filter: Resample,
        ) -> Result<PixelSurface, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Compose {
                width: target.width,
                height: target.height,
                filter,
            });
            if target.is_empty() {
                return Err(BackendError::InvalidDimensions {
                    width: target.width,
                    height: target.height,
                });
            }
            Ok(PixelSurface::filled(target, [255, 255, 255, 255]))
        }

        fn encode(
            &self,
            surface: &PixelSurface,
            format: OutputFormat,
            quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                width: surface.width(),
                height: surface.height(),
                format,
                quality: quality.value(),
            });
            if let Some(message) = &self.encode_failure {
                return Err(BackendError::Encode(message.clone()));
            }
            Ok(format!("{format}:{}x{}", surface.width(), surface.height()).into_bytes())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_dimensions(vec![Dimensions::new(800, 600)]);

        let surface = backend.decode(b"abc", "image/png").unwrap();
        assert_eq!(surface.dimensions(), Dimensions::new(800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode { len: 3, mime } if mime == "image/png"));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let surface = PixelSurface::filled(Dimensions::new(4, 2), [255; 4]);

        let bytes = backend
            .encode(&surface, OutputFormat::Webp, Quality::new(90))
            .unwrap();
        assert_eq!(bytes, b"webp:4x2");

        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Encode {
                width: 4,
                height: 2,
                format: OutputFormat::Webp,
                quality: 90,
            }
        ));
    }

    #[test]
    fn encode_str_rejects_bogus_format_before_backend() {
        let backend = MockBackend::new();
        let surface = PixelSurface::filled(Dimensions::new(2, 2), [255; 4]);

        let err = encode_str(&backend, &surface, "bogus-format", 80).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedFormat(_)));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn encode_str_clamps_quality() {
        let backend = MockBackend::new();
        let surface = PixelSurface::filled(Dimensions::new(2, 2), [255; 4]);

        encode_str(&backend, &surface, "image/jpeg", 400).unwrap();
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Encode { quality: 100, format: OutputFormat::Jpeg, .. }
        ));
    }

    #[test]
    fn surface_opacity() {
        let opaque = PixelSurface::filled(Dimensions::new(3, 3), [10, 20, 30, 255]);
        let clear = PixelSurface::filled(Dimensions::new(3, 3), [10, 20, 30, 0]);
        assert!(opaque.is_opaque());
        assert!(!clear.is_opaque());
    }

    #[test]
    fn dimensions_display_and_empty() {
        assert_eq!(Dimensions::new(1920, 1080).to_string(), "1920x1080");
        assert!(Dimensions::new(0, 5).is_empty());
        assert!(!Dimensions::new(1, 1).is_empty());
    }
}
