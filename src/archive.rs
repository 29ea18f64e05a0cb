//! ZIP bundling of optimized results.
//!
//! Entries are stored under each result's suggested filename, deflated, in
//! the order results are given. Names are not deduplicated: when two results
//! share a filename, the later one's bytes replace the earlier entry at the
//! earlier entry's position, so the archive holds one entry per distinct name.

use crate::types::OptimizedResult;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve entry names, letting later results overwrite earlier ones in place.
fn entries(results: &[OptimizedResult]) -> Vec<(&str, &[u8])> {
    let mut slots: Vec<(&str, &[u8])> = Vec::with_capacity(results.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for result in results {
        let name = result.filename.as_str();
        match index.get(name) {
            Some(&slot) => {
                warn!(name, "duplicate archive entry, keeping the later result");
                slots[slot].1 = &result.bytes;
            }
            None => {
                index.insert(name, slots.len());
                slots.push((name, &result.bytes));
            }
        }
    }
    slots
}

/// Bundle results into an in-memory ZIP archive.
pub fn bundle(results: &[OptimizedResult]) -> Result<Vec<u8>, ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for (name, bytes) in entries(results) {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }

    let bytes = writer.finish()?.into_inner();
    debug!(entries = results.len(), size = bytes.len(), "bundled archive");
    Ok(bytes)
}

/// Bundle results and write the archive to `path`. Returns the archive size.
pub fn write_bundle(path: &Path, results: &[OptimizedResult]) -> Result<usize, ArchiveError> {
    let bytes = bundle(results)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len())
}
