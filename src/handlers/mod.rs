//! Document handlers
//!
//! One handler per supported file format. Each handler knows how to
//! recognize its format, extract plain text from it and gather file
//! metadata; the shared processing pipeline in [`base`] drives the full
//! extract/detect/redact/entities workflow on top of that contract.

pub mod base;
pub mod docx;
pub mod image;
pub mod pdf;
pub mod text;

use crate::domain::document::DocumentMetadata;
use crate::domain::errors::DocumentError;
use async_trait::async_trait;
use std::path::Path;

pub use base::{DocumentPipeline, PipelineOptions};
pub use docx::DocxHandler;
pub use image::ImageHandler;
pub use pdf::PdfHandler;
pub use text::TextHandler;

/// Contract every document handler implements
///
/// Handlers are stateless after construction and shared across batch
/// workers.
#[async_trait]
pub trait DocumentHandler: Send + Sync {
    /// Short tag identifying this handler (also the result's content_type)
    fn name(&self) -> &'static str;

    /// File extensions this handler claims, lower-case without the dot
    fn extensions(&self) -> &'static [&'static str];

    /// Baseline confidence of this handler's extraction quality
    fn extraction_confidence(&self) -> f32 {
        0.9
    }

    /// Whether this handler can process the file
    ///
    /// Checks the extension, then the MIME type if supplied, then probes
    /// the file content best-effort. Must not raise on unreadable files;
    /// returns false instead.
    async fn can_handle(&self, path: &Path, mime_type: Option<&str>) -> bool;

    /// Extract plain text from the file
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] on unrecoverable failures (corrupt
    /// file, unsupported encoding, password-protected document).
    async fn extract_content(&self, path: &Path) -> Result<String, DocumentError>;

    /// Extract file metadata
    async fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata, DocumentError>;
}

/// Extension of a path, lower-cased, without the leading dot
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Filesystem timestamps of a file, best-effort
pub(crate) fn fs_timestamps(
    path: &Path,
) -> (
    Option<chrono::DateTime<chrono::Utc>>,
    Option<chrono::DateTime<chrono::Utc>>,
) {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let created = meta.created().ok().map(chrono::DateTime::from);
            let modified = meta.modified().ok().map(chrono::DateTime::from);
            (created, modified)
        }
        Err(_) => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/report.PDF")), Some("pdf".to_string()));
        assert_eq!(extension_of(Path::new("notes.txt")), Some("txt".to_string()));
        assert_eq!(extension_of(Path::new("no_extension")), None);
    }
}
