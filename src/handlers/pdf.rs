//! PDF document handler
//!
//! Extracts per-page text with lopdf. Encrypted documents get one
//! empty-password decryption attempt and then fail with a clear
//! password-protected error; a configurable page cap bounds memory on
//! pathological documents.

use crate::config::PdfHandlerConfig;
use crate::domain::document::DocumentMetadata;
use crate::domain::errors::DocumentError;
use crate::handlers::{extension_of, fs_timestamps, DocumentHandler};
use async_trait::async_trait;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// Separator inserted between pages of extracted text.
const PAGE_SEPARATOR: &str = "\n\u{000C}\n";

/// PDF handler
pub struct PdfHandler {
    config: PdfHandlerConfig,
}

impl PdfHandler {
    /// Create a handler from configuration
    pub fn new(config: PdfHandlerConfig) -> Self {
        Self { config }
    }

    /// Load a document, attempting empty-password decryption when needed
    fn load_document(path: &PathBuf) -> Result<Document, DocumentError> {
        let mut doc = Document::load(path).map_err(|e| DocumentError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(DocumentError::PasswordProtected(path.clone()));
            }
            tracing::debug!(path = %path.display(), "Opened PDF with empty password");
        }

        Ok(doc)
    }

    /// Extract text page by page, up to the configured cap
    fn extract_pages(doc: &Document, max_pages: u32, path: &Path) -> (String, u32, bool) {
        let pages = doc.get_pages();
        let total = pages.len() as u32;
        let capped = total > max_pages;

        let mut parts: Vec<String> = Vec::new();
        for (&page_number, _) in pages.iter().take(max_pages as usize) {
            match doc.extract_text(&[page_number]) {
                Ok(text) => parts.push(text),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        page = page_number,
                        error = %e,
                        "Failed to extract text from page"
                    );
                    parts.push(String::new());
                }
            }
        }

        (parts.join(PAGE_SEPARATOR), total, capped)
    }

    /// Best-effort notes about interactive content
    ///
    /// Full structured form extraction is out of scope; presence notes let
    /// reviewers know the text extraction may be incomplete.
    fn interactive_notes(doc: &Document) -> (bool, usize) {
        let has_form = doc
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"AcroForm").ok())
            .is_some();

        let mut annotated_pages = 0;
        for (_, page_id) in doc.get_pages() {
            if let Ok(page_dict) = doc.get_dictionary(page_id) {
                if page_dict.get(b"Annots").is_ok() {
                    annotated_pages += 1;
                }
            }
        }

        (has_form, annotated_pages)
    }
}

#[async_trait]
impl DocumentHandler for PdfHandler {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }

    fn extraction_confidence(&self) -> f32 {
        0.85
    }

    async fn can_handle(&self, path: &Path, mime_type: Option<&str>) -> bool {
        if extension_of(path).as_deref() == Some("pdf") {
            return true;
        }

        if mime_type == Some("application/pdf") {
            return true;
        }

        // Parse probe: a PDF starts with the %PDF- marker.
        match std::fs::File::open(path) {
            Ok(file) => {
                use std::io::Read;
                let mut magic = [0u8; 5];
                let mut take = file.take(5);
                matches!(take.read(&mut magic), Ok(5) if &magic == b"%PDF-")
            }
            Err(_) => false,
        }
    }

    async fn extract_content(&self, path: &Path) -> Result<String, DocumentError> {
        let path_buf = path.to_path_buf();
        let max_pages = self.config.max_pages;

        // lopdf is synchronous and parse-heavy; keep it off the async
        // workers.
        tokio::task::spawn_blocking(move || {
            let doc = Self::load_document(&path_buf)?;
            let (text, total, capped) = Self::extract_pages(&doc, max_pages, &path_buf);
            if capped {
                tracing::warn!(
                    path = %path_buf.display(),
                    total_pages = total,
                    max_pages = max_pages,
                    "PDF page count exceeds cap, extraction truncated"
                );
            }
            Ok(text)
        })
        .await
        .map_err(|e| DocumentError::ExtractionFailed {
            path: path.to_path_buf(),
            message: format!("extraction task failed: {e}"),
        })?
    }

    async fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata, DocumentError> {
        let size = std::fs::metadata(path)
            .map_err(|_| DocumentError::NotFound(path.to_path_buf()))?
            .len();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let path_buf = path.to_path_buf();
        let (page_count, version, has_form, annotated_pages) =
            tokio::task::spawn_blocking(move || {
                let doc = Self::load_document(&path_buf)?;
                let (has_form, annotated_pages) = Self::interactive_notes(&doc);
                Ok::<_, DocumentError>((
                    doc.get_pages().len() as u32,
                    doc.version.clone(),
                    has_form,
                    annotated_pages,
                ))
            })
            .await
            .map_err(|e| DocumentError::ExtractionFailed {
                path: path.to_path_buf(),
                message: format!("metadata task failed: {e}"),
            })??;

        let mut metadata = DocumentMetadata::new(file_name, size, "pdf", "application/pdf");
        let (created, modified) = fs_timestamps(path);
        metadata.created_at = created;
        metadata.modified_at = modified;
        metadata.page_count = Some(page_count);
        metadata.custom_properties.insert(
            "pdf_version".to_string(),
            serde_json::Value::String(version),
        );
        metadata.custom_properties.insert(
            "has_form_fields".to_string(),
            serde_json::Value::Bool(has_form),
        );
        metadata.custom_properties.insert(
            "annotated_pages".to_string(),
            serde_json::Value::from(annotated_pages),
        );

        Ok(metadata)
    }
}

impl Default for PdfHandler {
    fn default() -> Self {
        Self::new(PdfHandlerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use lopdf::{Object, Stream};
    use tempfile::tempdir;

    /// Build a minimal one-page PDF with the given page text.
    fn write_pdf(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let content = lopdf::content::Content {
            operations: vec![
                lopdf::content::Operation::new("BT", vec![]),
                lopdf::content::Operation::new("Tf", vec!["F1".into(), 12.into()]),
                lopdf::content::Operation::new("Td", vec![50.into(), 700.into()]),
                lopdf::content::Operation::new(
                    "Tj",
                    vec![Object::string_literal(text)],
                ),
                lopdf::content::Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = dir.path().join(name);
        doc.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_can_handle_by_extension_and_magic() {
        let handler = PdfHandler::default();
        let dir = tempdir().unwrap();

        assert!(handler.can_handle(Path::new("report.pdf"), None).await);
        assert!(
            handler
                .can_handle(Path::new("blob.bin"), Some("application/pdf"))
                .await
        );

        let path = dir.path().join("untyped");
        std::fs::write(&path, b"%PDF-1.5 rest").unwrap();
        assert!(handler.can_handle(&path, None).await);

        let not_pdf = dir.path().join("notes.bin");
        std::fs::write(&not_pdf, b"hello").unwrap();
        assert!(!handler.can_handle(&not_pdf, None).await);
    }

    #[tokio::test]
    async fn test_extract_content_single_page() {
        let handler = PdfHandler::default();
        let dir = tempdir().unwrap();
        let path = write_pdf(&dir, "visit.pdf", "Patient SSN 123-45-6789");

        let text = handler.extract_content(&path).await.unwrap();
        assert!(text.contains("123-45-6789"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_typed_error() {
        let handler = PdfHandler::default();
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.5 this is not a real pdf body").unwrap();

        let err = handler.extract_content(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_metadata_reports_pages_and_notes() {
        let handler = PdfHandler::default();
        let dir = tempdir().unwrap();
        let path = write_pdf(&dir, "form.pdf", "hello");

        let metadata = handler.extract_metadata(&path).await.unwrap();
        assert_eq!(metadata.page_count, Some(1));
        assert_eq!(metadata.file_type, "pdf");
        assert_eq!(
            metadata.custom_properties["has_form_fields"],
            serde_json::Value::Bool(false)
        );
    }
}
