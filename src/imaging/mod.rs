//! Image processing: decode, plan, compose, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, WebP, GIF) |
//! | **Plan** | [`plan_dimensions`]: two-step width/height clamp |
//! | **Compose** | `imageops::resize` + integer blend onto opaque white |
//! | **Encode** | `image` JPEG/PNG encoders, `webp` for lossy WebP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The pipeline combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, PixelSurface, encode_str};
pub use calculations::plan_dimensions;
pub use operations::{CancelFlag, Encoded, PipelineError, Stage, plan_for, run_pipeline};
pub use params::{Bounds, EncodeSettings, OutputFormat, PipelineParams, Quality, Resample};
pub use rust_backend::{RustBackend, SUPPORTED_INPUT_MIME_TYPES, is_supported_input};
