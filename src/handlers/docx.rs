//! DOCX document handler
//!
//! A DOCX file is a zip archive of WordprocessingML parts. This handler
//! extracts body paragraphs, tables (as pipe-delimited rows, skipping
//! fully-empty rows) and per-section header/footer text. Reviewer comments
//! (word/comments.xml) are deliberately not extracted: comment threads can
//! carry unrelated sensitive information and are outside administrative
//! processing.

use crate::domain::document::DocumentMetadata;
use crate::domain::errors::DocumentError;
use crate::handlers::{extension_of, fs_timestamps, DocumentHandler};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// DOCX handler
pub struct DocxHandler;

impl DocxHandler {
    /// Create a new handler
    pub fn new() -> Self {
        Self
    }

    fn open_archive(path: &PathBuf) -> Result<ZipArchive<std::fs::File>, DocumentError> {
        let file = std::fs::File::open(path)
            .map_err(|_| DocumentError::NotFound(path.clone()))?;
        ZipArchive::new(file).map_err(|e| DocumentError::Corrupt {
            path: path.clone(),
            message: format!("not a zip archive: {e}"),
        })
    }

    fn read_part(
        archive: &mut ZipArchive<std::fs::File>,
        name: &str,
    ) -> Result<Option<String>, DocumentError> {
        match archive.by_name(name) {
            Ok(mut part) => {
                let mut xml = String::new();
                part.read_to_string(&mut xml).map_err(|e| {
                    DocumentError::Corrupt {
                        path: PathBuf::from(name),
                        message: e.to_string(),
                    }
                })?;
                Ok(Some(xml))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(DocumentError::Corrupt {
                path: PathBuf::from(name),
                message: e.to_string(),
            }),
        }
    }

    /// Extract readable text from one WordprocessingML part
    ///
    /// Handles runs of `w:t` text, paragraph and line breaks, tabs, and
    /// tables (one pipe-delimited line per row with non-empty cells).
    fn extract_xml_text(xml: &str) -> Result<String, String> {
        let mut reader = Reader::from_str(xml);
        let mut out = String::new();
        let mut in_text = false;
        let mut table_depth = 0usize;
        let mut cell_text = String::new();
        let mut row_cells: Vec<String> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"tbl" => table_depth += 1,
                    b"t" => in_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => {
                    let target = if table_depth > 0 { &mut cell_text } else { &mut out };
                    match e.local_name().as_ref() {
                        b"tab" => target.push('\t'),
                        b"br" => target.push('\n'),
                        _ => {}
                    }
                }
                Ok(Event::Text(t)) if in_text => {
                    let unescaped = t.unescape().map_err(|e| e.to_string())?;
                    if table_depth > 0 {
                        cell_text.push_str(&unescaped);
                    } else {
                        out.push_str(&unescaped);
                    }
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" => {
                        if table_depth > 0 {
                            cell_text.push(' ');
                        } else {
                            out.push('\n');
                        }
                    }
                    b"tc" => {
                        row_cells.push(cell_text.trim().to_string());
                        cell_text.clear();
                    }
                    b"tr" => {
                        if row_cells.iter().any(|c| !c.is_empty()) {
                            out.push_str(&row_cells.join(" | "));
                            out.push('\n');
                        }
                        row_cells.clear();
                    }
                    b"tbl" => {
                        table_depth = table_depth.saturating_sub(1);
                        out.push('\n');
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.to_string()),
                _ => {}
            }
        }

        Ok(out)
    }

    /// Pull a few core properties out of docProps/core.xml
    fn extract_core_properties(xml: &str) -> Vec<(String, String)> {
        let mut reader = Reader::from_str(xml);
        let mut properties = Vec::new();
        let mut current: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if matches!(name.as_str(), "title" | "creator" | "created" | "modified") {
                        current = Some(name);
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(ref key) = current {
                        if let Ok(value) = t.unescape() {
                            properties.push((key.clone(), value.into_owned()));
                        }
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(_) => break,
                _ => {}
            }
        }

        properties
    }

    /// Header and footer part names, in archive order
    fn header_footer_parts(archive: &ZipArchive<std::fs::File>) -> Vec<String> {
        let mut parts: Vec<String> = archive
            .file_names()
            .filter(|name| {
                (name.starts_with("word/header") || name.starts_with("word/footer"))
                    && name.ends_with(".xml")
            })
            .map(|name| name.to_string())
            .collect();
        parts.sort();
        parts
    }
}

#[async_trait]
impl DocumentHandler for DocxHandler {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["docx"]
    }

    async fn can_handle(&self, path: &Path, mime_type: Option<&str>) -> bool {
        if extension_of(path).as_deref() == Some("docx") {
            return true;
        }

        if mime_type == Some(DOCX_MIME) {
            return true;
        }

        // Parse probe: a zip archive containing word/document.xml.
        match std::fs::File::open(path) {
            Ok(file) => match ZipArchive::new(file) {
                Ok(archive) => archive
                    .file_names()
                    .any(|name| name == "word/document.xml"),
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    async fn extract_content(&self, path: &Path) -> Result<String, DocumentError> {
        let path_buf = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut archive = Self::open_archive(&path_buf)?;

            let body_xml = Self::read_part(&mut archive, "word/document.xml")?.ok_or_else(|| {
                DocumentError::Corrupt {
                    path: path_buf.clone(),
                    message: "missing word/document.xml".to_string(),
                }
            })?;

            let mut text =
                Self::extract_xml_text(&body_xml).map_err(|e| DocumentError::Corrupt {
                    path: path_buf.clone(),
                    message: format!("invalid document XML: {e}"),
                })?;

            for part_name in Self::header_footer_parts(&archive) {
                if let Some(xml) = Self::read_part(&mut archive, &part_name)? {
                    match Self::extract_xml_text(&xml) {
                        Ok(part_text) if !part_text.trim().is_empty() => {
                            text.push('\n');
                            text.push_str(part_text.trim_end());
                            text.push('\n');
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(
                                part = %part_name,
                                error = %e,
                                "Skipping unparseable header/footer part"
                            );
                        }
                    }
                }
            }

            Ok(text.trim_end().to_string())
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

        let mut metadata = DocumentMetadata::new(file_name, size, "docx", DOCX_MIME);
        let (created, modified) = fs_timestamps(path);
        metadata.created_at = created;
        metadata.modified_at = modified;

        let path_buf = path.to_path_buf();
        let core_properties = tokio::task::spawn_blocking(move || {
            let mut archive = Self::open_archive(&path_buf)?;
            let properties = Self::read_part(&mut archive, "docProps/core.xml")?
                .map(|xml| Self::extract_core_properties(&xml))
                .unwrap_or_default();
            Ok::<_, DocumentError>(properties)
        })
        .await
        .map_err(|e| DocumentError::ExtractionFailed {
            path: path.to_path_buf(),
            message: format!("metadata task failed: {e}"),
        })??;

        for (key, value) in core_properties {
            metadata
                .custom_properties
                .insert(format!("docx_{key}"), serde_json::Value::String(value));
        }

        Ok(metadata)
    }
}

impl Default for DocxHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::FileOptions;

    const BODY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Visit summary for MRN: AB123456</w:t></w:r></w:p>
    <w:p><w:r><w:t>Follow-up in two weeks.</w:t></w:r></w:p>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Field</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>Value</w:t></w:r></w:p></w:tc>
      </w:tr>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Phone</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>555-123-4567</w:t></w:r></w:p></w:tc>
      </w:tr>
      <w:tr>
        <w:tc><w:p><w:r><w:t></w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t></w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
  </w:body>
</w:document>"#;

    const HEADER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:p><w:r><w:t>Mercy Clinic Intake</w:t></w:r></w:p>
</w:hdr>"#;

    const COMMENTS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:comments xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:comment w:id="0"><w:p><w:r><w:t>reviewer-only secret</w:t></w:r></w:p></w:comment>
</w:comments>"#;

    fn write_docx(dir: &tempfile::TempDir, name: &str, with_extras: bool) -> PathBuf {
        let path = dir.path().join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options: FileOptions = FileOptions::default();

        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(BODY_XML.as_bytes()).unwrap();

        if with_extras {
            writer.start_file("word/header1.xml", options).unwrap();
            writer.write_all(HEADER_XML.as_bytes()).unwrap();

            writer.start_file("word/comments.xml", options).unwrap();
            writer.write_all(COMMENTS_XML.as_bytes()).unwrap();

            writer.start_file("docProps/core.xml", options).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>Intake Form</dc:title>
  <dc:creator>front-desk</dc:creator>
</cp:coreProperties>"#,
                )
                .unwrap();
        }

        writer.finish().unwrap();
        path
    }

    #[tokio::test]
    async fn test_extract_body_and_table() {
        let handler = DocxHandler::new();
        let dir = tempdir().unwrap();
        let path = write_docx(&dir, "visit.docx", false);

        let text = handler.extract_content(&path).await.unwrap();
        assert!(text.contains("Visit summary for MRN: AB123456"));
        assert!(text.contains("Follow-up in two weeks."));
        assert!(text.contains("Phone | 555-123-4567"));
    }

    #[tokio::test]
    async fn test_empty_table_rows_skipped() {
        let handler = DocxHandler::new();
        let dir = tempdir().unwrap();
        let path = write_docx(&dir, "visit.docx", false);

        let text = handler.extract_content(&path).await.unwrap();
        // The fully-empty third row must not produce a "|" line.
        assert!(!text.lines().any(|l| l.trim() == "|"));
    }

    #[tokio::test]
    async fn test_headers_extracted_comments_excluded() {
        let handler = DocxHandler::new();
        let dir = tempdir().unwrap();
        let path = write_docx(&dir, "full.docx", true);

        let text = handler.extract_content(&path).await.unwrap();
        assert!(text.contains("Mercy Clinic Intake"));
        assert!(!text.contains("reviewer-only secret"));
    }

    #[tokio::test]
    async fn test_metadata_core_properties() {
        let handler = DocxHandler::new();
        let dir = tempdir().unwrap();
        let path = write_docx(&dir, "full.docx", true);

        let metadata = handler.extract_metadata(&path).await.unwrap();
        assert_eq!(metadata.file_type, "docx");
        assert_eq!(
            metadata.custom_properties["docx_title"],
            serde_json::Value::String("Intake Form".to_string())
        );
        assert_eq!(
            metadata.custom_properties["docx_creator"],
            serde_json::Value::String("front-desk".to_string())
        );
    }

    #[tokio::test]
    async fn test_can_handle_probe() {
        let handler = DocxHandler::new();
        let dir = tempdir().unwrap();

        let docx = write_docx(&dir, "real.docx", false);
        assert!(handler.can_handle(&docx, None).await);

        // Extensionless but structurally a DOCX: probe accepts it.
        let renamed = dir.path().join("mystery");
        std::fs::copy(&docx, &renamed).unwrap();
        assert!(handler.can_handle(&renamed, None).await);

        let plain = dir.path().join("plain.bin");
        std::fs::write(&plain, b"not zip").unwrap();
        assert!(!handler.can_handle(&plain, None).await);
    }

    #[tokio::test]
    async fn test_corrupt_docx_typed_error() {
        let handler = DocxHandler::new();
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"PK\x03\x04 but truncated").unwrap();

        let err = handler.extract_content(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::Corrupt { .. }));
    }
}
