//! Shared types passed between the caller and the pipeline.
//!
//! [`SourceImage`] goes in, [`OptimizedResult`] comes out. Both are plain
//! owned data; nothing here touches pixels.

use crate::imaging::{Dimensions, OutputFormat};
use crate::preview::PreviewHandle;
use serde::Serialize;
use std::io;
use std::path::Path;

/// An encoded image handed to the pipeline.
///
/// Immutable once built. The pipeline only borrows the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    bytes: Vec<u8>,
    mime: String,
    filename: String,
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            filename: filename.into(),
        }
    }

    /// Read a file from disk, deriving the declared MIME type from its extension.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_from_filename(&filename);
        Ok(Self::new(bytes, mime, filename))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess a MIME type from a filename extension.
///
/// Only the types a browser file picker would report for this tool are
/// mapped; everything else is `application/octet-stream`.
pub fn mime_from_filename(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Output of one successful optimize call.
#[derive(Debug, Serialize)]
pub struct OptimizedResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub filename: String,
    pub format: OutputFormat,
    pub original_size: usize,
    pub output_size: usize,
    pub source_dimensions: Dimensions,
    pub output_dimensions: Dimensions,
    /// Transient display handle. The caller releases it; nothing else tracks it.
    #[serde(skip)]
    pub preview: Option<PreviewHandle>,
}

impl OptimizedResult {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Size reduction relative to the original, in percent. Negative when
    /// the output grew.
    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.output_size as f64 / self.original_size as f64) * 100.0
    }

    /// Release the preview handle, if one was issued.
    pub fn release_preview(&mut self) -> io::Result<()> {
        match self.preview.take() {
            Some(handle) => handle.release(),
            None => Ok(()),
        }
    }
}
