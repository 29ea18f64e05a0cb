//! Transient display handles for optimized output.
//!
//! A [`PreviewHandle`] is a temp file holding one result's bytes, addressable
//! by path or `file://` URI so a viewer can display it. The optimizer issues
//! one per result and forgets about it: the caller owns the handle and is
//! expected to [`release`](PreviewHandle::release) it once the preview is no
//! longer shown. Dropping the handle also deletes the file, but swallows any
//! I/O error, so long-running callers should release explicitly.

use crate::imaging::OutputFormat;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

const PREFIX: &str = "imgpress-preview-";

#[derive(Debug)]
pub struct PreviewHandle {
    path: TempPath,
}

impl PreviewHandle {
    /// Write `bytes` to a new temp file in `dir` (or the system temp dir).
    pub fn create(bytes: &[u8], format: OutputFormat, dir: Option<&Path>) -> io::Result<Self> {
        let suffix = format!(".{}", format.extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX).suffix(&suffix);

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Percent-encoded `file://` URI for the preview file.
    pub fn uri(&self) -> String {
        let path: PathBuf = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.to_path_buf());
        let mut text = path.to_string_lossy().into_owned();
        if cfg!(windows) {
            text = text
                .strip_prefix(r"\\?\")
                .unwrap_or(&text)
                .replace('\\', "/");
        }
        file_uri(&text)
    }

    /// Delete the preview file now, reporting any failure.
    pub fn release(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Build a `file://` URI from a `/`-separated path.
///
/// Unreserved characters, `/` and `:` pass through; every other byte of the
/// UTF-8 encoding becomes `%XX`. Drive paths (`C:/...`) get a leading `/`.
fn file_uri(path: &str) -> String {
    let mut uri = String::from("file://");
    if !path.starts_with('/') {
        uri.push('/');
    }
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                uri.push(byte as char)
            }
            _ => {
                let _ = write!(uri, "%{byte:02X}");
            }
        }
    }
    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_writes_bytes_with_format_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let handle = PreviewHandle::create(b"pixels", OutputFormat::Webp, Some(tmp.path())).unwrap();

        assert!(handle.path().starts_with(tmp.path()));
        assert_eq!(handle.path().extension().unwrap(), "webp");
        assert_eq!(std::fs::read(handle.path()).unwrap(), b"pixels");
        assert!(handle.uri().starts_with("file://"));
    }

    #[test]
    fn file_uri_escapes_reserved_and_non_ascii_bytes() {
        assert_eq!(file_uri("/tmp/plain-name_1.jpg"), "file:///tmp/plain-name_1.jpg");
        assert_eq!(file_uri("/tmp/my photos/a b.png"), "file:///tmp/my%20photos/a%20b.png");
        assert_eq!(file_uri("/tmp/caf\u{e9}.webp"), "file:///tmp/caf%C3%A9.webp");
        assert_eq!(file_uri("/tmp/50%#?.png"), "file:///tmp/50%25%23%3F.png");
    }

    #[test]
    fn file_uri_for_drive_path() {
        assert_eq!(
            file_uri("C:/Users/Ana Lee/out.jpg"),
            "file:///C:/Users/Ana%20Lee/out.jpg"
        );
    }

    #[test]
    fn uri_of_file_in_spaced_dir_is_encoded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("preview dir");
        std::fs::create_dir(&dir).unwrap();

        let handle = PreviewHandle::create(b"x", OutputFormat::Png, Some(&dir)).unwrap();
        let uri = handle.uri();
        assert!(uri.contains("/preview%20dir/"), "{uri}");
        assert!(!uri.contains(' '));
    }

    #[test]
    fn release_deletes_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let handle = PreviewHandle::create(b"x", OutputFormat::Jpeg, Some(tmp.path())).unwrap();
        let path = handle.path().to_path_buf();

        handle.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn handles_are_independent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = PreviewHandle::create(b"a", OutputFormat::Png, Some(tmp.path())).unwrap();
        let b = PreviewHandle::create(b"b", OutputFormat::Png, Some(tmp.path())).unwrap();
        assert_ne!(a.path(), b.path());

        let b_path = b.path().to_path_buf();
        a.release().unwrap();
        assert!(b_path.exists());
        drop(b);
        assert!(!b_path.exists());
    }

    #[test]
    fn create_in_missing_dir_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(PreviewHandle::create(b"x", OutputFormat::Png, Some(&missing)).is_err());
    }
}
