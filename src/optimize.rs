//! Pipeline orchestration.
//!
//! [`Optimizer`] takes a [`SourceImage`] plus caller-chosen quality and format,
//! runs the imaging pipeline, and packages an [`OptimizedResult`] with byte
//! counts, a suggested filename, and (optionally) a preview handle.
//!
//! ## Entry points
//!
//! | Method | Runs on |
//! |---|---|
//! | [`Optimizer::optimize`] | tokio blocking pool; awaits without blocking other calls |
//! | [`Optimizer::optimize_blocking`] | the calling thread |
//! | [`Optimizer::optimize_batch`] | rayon pool, one result per source, input order kept |
//!
//! Calls share no mutable state, so any number may run concurrently.
//!
//! ## Failure
//!
//! Any stage error is returned unchanged; there are no retries. A result is
//! either complete (bytes + preview) or not produced at all: the preview is
//! only written after encoding succeeds, and a failed preview write fails the
//! call.

use crate::config::OptimizerConfig;
use crate::imaging::{
    BackendError, Bounds, CancelFlag, EncodeSettings, ImageBackend, PipelineError, PipelineParams,
    Resample, RustBackend, Stage, run_pipeline,
};
use crate::naming::suggested_filename;
use crate::preview::PreviewHandle;
use crate::types::{OptimizedResult, SourceImage};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error(transparent)]
    Imaging(#[from] BackendError),
    #[error("Failed to write preview: {0}")]
    Preview(#[source] std::io::Error),
    #[error("Cancelled before {0:?}")]
    Cancelled(Stage),
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl From<PipelineError> for OptimizeError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Backend(e) => Self::Imaging(e),
            PipelineError::Cancelled(stage) => Self::Cancelled(stage),
        }
    }
}

/// Orchestrator options that are not per-call.
#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    pub bounds: Bounds,
    pub filter: Resample,
    pub preview: bool,
    pub preview_dir: Option<PathBuf>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self::from_config(&OptimizerConfig::default())
    }
}

impl OptimizerOptions {
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            bounds: config.bounds(),
            filter: config.resample.filter,
            preview: config.preview.enabled,
            preview_dir: config.preview.dir.clone(),
        }
    }
}

/// The pipeline orchestrator. Cheap to clone; clones share the backend.
pub struct Optimizer<B = RustBackend> {
    backend: Arc<B>,
    options: OptimizerOptions,
}

impl<B> Clone for Optimizer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            options: self.options.clone(),
        }
    }
}

impl Optimizer<RustBackend> {
    pub fn new(options: OptimizerOptions) -> Self {
        Self::with_backend(RustBackend::new(), options)
    }
}

impl Default for Optimizer<RustBackend> {
    fn default() -> Self {
        Self::new(OptimizerOptions::default())
    }
}

impl<B: ImageBackend + 'static> Optimizer<B> {
    pub fn with_backend(backend: B, options: OptimizerOptions) -> Self {
        Self {
            backend: Arc::new(backend),
            options,
        }
    }

    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// Optimize one image without blocking the async runtime.
    ///
    /// `quality` is clamped to 1–100; `format` is a name or MIME type and
    /// fails with [`BackendError::UnsupportedFormat`] when unknown.
    pub async fn optimize(
        &self,
        source: SourceImage,
        quality: u32,
        format: &str,
    ) -> Result<OptimizedResult, OptimizeError> {
        let settings = EncodeSettings::new(quality, format)?;
        self.optimize_with(source, settings, None).await
    }

    /// Async optimize with parsed settings and an optional cancellation flag.
    pub async fn optimize_with(
        &self,
        source: SourceImage,
        settings: EncodeSettings,
        cancel: Option<CancelFlag>,
    ) -> Result<OptimizedResult, OptimizeError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.run(&source, settings, cancel.as_ref()))
            .await
            .map_err(|e| OptimizeError::Worker(e.to_string()))?
    }

    /// Synchronous optimize on the calling thread.
    pub fn optimize_blocking(
        &self,
        source: &SourceImage,
        quality: u32,
        format: &str,
    ) -> Result<OptimizedResult, OptimizeError> {
        let settings = EncodeSettings::new(quality, format)?;
        self.run(source, settings, None)
    }

    /// Optimize many sources in parallel on the rayon pool.
    ///
    /// Failures do not stop the batch; each source gets its own `Result`,
    /// returned in input order.
    pub fn optimize_batch(
        &self,
        sources: &[SourceImage],
        settings: EncodeSettings,
    ) -> Vec<Result<OptimizedResult, OptimizeError>> {
        info!(count = sources.len(), format = %settings.format, "optimizing batch");
        sources
            .par_iter()
            .map(|source| {
                let result = self.run(source, settings, None);
                if let Err(e) = &result {
                    warn!(file = source.filename(), error = %e, "optimize failed");
                }
                result
            })
            .collect()
    }

    /// Run the pipeline and package the result.
    fn run(
        &self,
        source: &SourceImage,
        settings: EncodeSettings,
        cancel: Option<&CancelFlag>,
    ) -> Result<OptimizedResult, OptimizeError> {
        let params = PipelineParams {
            bounds: self.options.bounds,
            filter: self.options.filter,
            settings,
        };
        debug!(
            file = source.filename(),
            mime = source.mime(),
            size = source.len(),
            "optimize started"
        );

        let encoded = run_pipeline(
            self.backend.as_ref(),
            source.bytes(),
            source.mime(),
            &params,
            cancel,
        )?;

        let preview = if self.options.preview {
            let handle = PreviewHandle::create(
                &encoded.bytes,
                settings.format,
                self.options.preview_dir.as_deref(),
            )
            .map_err(OptimizeError::Preview)?;
            Some(handle)
        } else {
            None
        };

        let result = OptimizedResult {
            filename: suggested_filename(source.filename(), settings.format),
            format: settings.format,
            original_size: source.len(),
            output_size: encoded.bytes.len(),
            source_dimensions: encoded.source,
            output_dimensions: encoded.output,
            bytes: encoded.bytes,
            preview,
        };
        info!(
            file = source.filename(),
            output = %result.filename,
            before = result.original_size,
            after = result.output_size,
            "optimized"
        );
        Ok(result)
    }
}
