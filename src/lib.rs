//! # imgpress
//!
//! Client-side image optimization: take an encoded image, scale it down to
//! fit display bounds, flatten any transparency onto white, and re-encode it
//! as JPEG, PNG or WebP at a chosen quality.
//!
//! # Architecture: One Pipeline, Four Stages
//!
//! ```text
//! bytes ──decode──► surface ──plan──► target size ──compose──► opaque surface ──encode──► bytes
//! ```
//!
//! - **Plan** is pure integer math ([`imaging::plan_dimensions`]), so the sizing
//!   rules are unit tested without touching pixels.
//! - **Decode / Compose / Encode** go through the [`imaging::ImageBackend`]
//!   trait. Tests swap in a recording mock; production uses
//!   [`imaging::RustBackend`].
//! - The [`optimize`] module wraps the pipeline in an [`Optimizer`] that
//!   packages an [`OptimizedResult`] and picks where the work runs (tokio
//!   blocking pool, calling thread, or rayon for batches).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Dimension planning, backend trait, pure-Rust backend, pipeline runner |
//! | [`optimize`] | [`Optimizer`]: async, blocking and batch entry points |
//! | [`types`] | [`SourceImage`] in, [`OptimizedResult`] out |
//! | [`naming`] | `optimized_<base>.<ext>` filename suggestions |
//! | [`preview`] | Temp-file preview handles owned by the caller |
//! | [`archive`] | ZIP bundling of a batch of results |
//! | [`config`] | Layered `imgpress.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Never Upscale
//!
//! Images already inside the bounds keep their exact size. Larger ones are
//! clamped by width first, then by height, keeping the aspect ratio within
//! one rounding step per axis. Default bounds are 1920x1080; 3840x2160 is one
//! config line (or `--uhd`) away.
//!
//! ## Always Opaque
//!
//! Every output is composited onto opaque white before encoding, even PNG.
//! Transparent regions come out white, half-transparent ones are blended.
//! This keeps JPEG and PNG output visually identical.
//!
//! ## Stateless Calls
//!
//! Optimize calls share nothing mutable. Each decoded surface is owned by one
//! pipeline run and freed before the call returns, so any number of calls can
//! run side by side.

pub mod archive;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod optimize;
pub mod output;
pub mod preview;
pub mod types;

pub use optimize::{OptimizeError, Optimizer, OptimizerOptions};
pub use types::{OptimizedResult, SourceImage};

#[cfg(test)]
pub(crate) mod test_helpers;
