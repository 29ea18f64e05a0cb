//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which sequences the pipeline) and the [`backend`](super::backend) (which
//! does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`OutputFormat`]: The three encodable formats: JPEG, PNG, WebP.
//! - [`Bounds`]: Maximum output dimensions. `HD` (1920×1080) is the default, `UHD` (3840×2160) the alternative.
//! - [`Resample`]: Filter used when the compositor scales the source.
//! - [`EncodeSettings`]: Quality + format, as chosen by the caller.
//! - [`PipelineParams`]: Everything one pipeline run needs besides the source bytes.

use super::backend::BackendError;
use image::ImageFormat;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Normalized quality factor in `[0.0, 1.0]`.
    pub fn factor(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Output encoding. Anything outside this set is an [`BackendError::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// Parse a format name or MIME type (`"jpeg"`, `"jpg"`, `"image/webp"`, ...).
    pub fn parse(value: &str) -> Result<Self, BackendError> {
        let lower = value.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("image/").unwrap_or(&lower);
        match name {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            _ => Err(BackendError::UnsupportedFormat(value.to_string())),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// File extension used for suggested output names.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// PNG ignores quality; the other two are lossy.
    pub fn is_lossy(self) -> bool {
        !matches!(self, Self::Png)
    }

    /// Identify an encoded payload by its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        })
    }
}

/// Maximum output dimensions. Sources inside the bounds are never upscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl Bounds {
    pub const HD: Bounds = Bounds {
        max_width: 1920,
        max_height: 1080,
    };

    pub const UHD: Bounds = Bounds {
        max_width: 3840,
        max_height: 2160,
    };
}

impl Default for Bounds {
    fn default() -> Self {
        Self::HD
    }
}

/// Resampling filter used by the compositor.
///
/// `Triangle` (bilinear) is the default and mirrors what a browser canvas
/// does with default smoothing. The others trade speed for sharpness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Resample {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Resample {
    pub fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Caller-chosen encode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSettings {
    pub quality: Quality,
    pub format: OutputFormat,
}

impl EncodeSettings {
    /// Build settings from raw UI values: quality is clamped, format is parsed.
    pub fn new(quality: u32, format: &str) -> Result<Self, BackendError> {
        Ok(Self {
            quality: Quality::new(quality),
            format: OutputFormat::parse(format)?,
        })
    }
}

/// Everything one pipeline run needs besides the source bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineParams {
    pub bounds: Bounds,
    pub filter: Resample,
    pub settings: EncodeSettings,
}
