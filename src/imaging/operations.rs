//! High-level image operations.
//!
//! These functions combine calculations with backend execution: decode,
//! plan, compose, encode. They are synchronous and backend-agnostic; the
//! [`optimize`](crate::optimize) module decides where they run.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::plan_dimensions;
use super::params::{Bounds, OutputFormat, PipelineParams};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

/// Cooperative cancellation flag, checked between pipeline stages.
///
/// Cloning shares the flag. A stage that has started always runs to
/// completion; cancellation takes effect at the next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pipeline stage names, used for cancellation reporting and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Compose,
    Encode,
}

/// Why a pipeline run stopped early.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Cancelled before the given stage started.
    #[error("Cancelled before {0:?}")]
    Cancelled(Stage),
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub source: Dimensions,
    pub output: Dimensions,
}

/// Plan the output size for a source under the given bounds.
pub fn plan_for(source: Dimensions, bounds: Bounds) -> Dimensions {
    let (width, height) = plan_dimensions(
        source.width,
        source.height,
        bounds.max_width,
        bounds.max_height,
    );
    Dimensions::new(width, height)
}

/// Pick between the re-encoded output and the untouched source payload.
///
/// The source is returned as-is only when it is already a valid result:
/// same format, same dimensions, no transparency to flatten, and smaller
/// than what the encoder produced.
fn smaller_of(
    source_bytes: &[u8],
    encoded: Vec<u8>,
    format: OutputFormat,
    resized: bool,
    opaque: bool,
) -> Vec<u8> {
    let reusable = !resized
        && opaque
        && OutputFormat::sniff(source_bytes) == Some(format)
        && source_bytes.len() < encoded.len();
    if reusable {
        debug!(
            source = source_bytes.len(),
            encoded = encoded.len(),
            "re-encode grew the payload, keeping source bytes"
        );
        source_bytes.to_vec()
    } else {
        encoded
    }
}

fn checkpoint(cancel: Option<&CancelFlag>, next: Stage) -> Result<(), PipelineError> {
    match cancel {
        Some(flag) if flag.is_cancelled() => Err(PipelineError::Cancelled(next)),
        _ => Ok(()),
    }
}

/// Run decode → plan → compose → encode.
///
/// Every intermediate surface is dropped before this returns, on both the
/// success and the error path. No partial output is ever produced.
///
/// Re-running on its own output never grows the payload: when the source is
/// already an opaque image of the requested format and size, and the fresh
/// encode is larger, the source bytes are returned instead.
pub fn run_pipeline(
    backend: &impl ImageBackend,
    input: &[u8],
    declared_mime: &str,
    params: &PipelineParams,
    cancel: Option<&CancelFlag>,
) -> Result<Encoded, PipelineError> {
    checkpoint(cancel, Stage::Decode)?;
    let decoded = backend.decode(input, declared_mime)?;
    let source = decoded.dimensions();
    let opaque = decoded.is_opaque();

    let target = plan_for(source, params.bounds);
    debug!(%source, %target, bounds = ?params.bounds, "planned dimensions");

    checkpoint(cancel, Stage::Compose)?;
    let composed = backend.compose(&decoded, target, params.filter)?;
    drop(decoded);

    checkpoint(cancel, Stage::Encode)?;
    let encoded = backend.encode(&composed, params.settings.format, params.settings.quality)?;
    let bytes = smaller_of(
        input,
        encoded,
        params.settings.format,
        target != source,
        opaque,
    );
    debug!(
        format = %params.settings.format,
        quality = params.settings.quality.value(),
        size = bytes.len(),
        "encoded output"
    );

    Ok(Encoded {
        bytes,
        source,
        output: target,
    })
}
