//! Plain-text document handler
//!
//! Decodes text files by trying a fixed ladder of encodings, enforces a
//! size cap before any decoding is attempted, collapses runs of blank
//! lines and classifies the content heuristically for downstream metadata.

use crate::config::TextHandlerConfig;
use crate::domain::document::DocumentMetadata;
use crate::domain::errors::DocumentError;
use crate::handlers::{extension_of, fs_timestamps, DocumentHandler};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// Candidate encodings, tried in order
///
/// Strict UTF-8 first, then pure ASCII, then Latin-1 (rejecting C1 control
/// bytes, which real Latin-1 text does not contain), then Windows-1252
/// which maps most of the C1 range to printable punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Ascii,
    Iso8859_1,
    Cp1252,
}

impl TextEncoding {
    const LADDER: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Ascii,
        TextEncoding::Iso8859_1,
        TextEncoding::Cp1252,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Iso8859_1 => "iso-8859-1",
            Self::Cp1252 => "cp1252",
        }
    }

    fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            Self::Ascii => {
                if bytes.is_ascii() {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                } else {
                    None
                }
            }
            Self::Iso8859_1 => {
                if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
                    None
                } else {
                    Some(bytes.iter().map(|&b| b as char).collect())
                }
            }
            Self::Cp1252 => {
                let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
                if had_errors {
                    None
                } else {
                    Some(decoded.into_owned())
                }
            }
        }
    }
}

/// Heuristic content classification, for downstream metadata only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Csv,
    Tabular,
    Markdown,
    MedicalText,
    Log,
    Plain,
}

impl ContentClass {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tabular => "tabular",
            Self::Markdown => "markdown",
            Self::MedicalText => "medical-text",
            Self::Log => "log",
            Self::Plain => "plain",
        }
    }
}

const MEDICAL_KEYWORDS: &[&str] = &[
    "patient",
    "diagnosis",
    "medication",
    "treatment",
    "symptoms",
    "prescribed",
    "clinical",
    "dosage",
    "allergies",
    "discharge",
];

/// Plain-text handler
pub struct TextHandler {
    config: TextHandlerConfig,
    blank_lines: Regex,
}

impl TextHandler {
    /// Create a handler from configuration
    pub fn new(config: TextHandlerConfig) -> Self {
        Self {
            config,
            blank_lines: Regex::new(r"\n{3,}").expect("blank-line pattern is valid"),
        }
    }

    /// Enforce the size cap before any bytes are decoded
    fn check_size(&self, path: &Path) -> Result<u64, DocumentError> {
        let meta = std::fs::metadata(path)
            .map_err(|_| DocumentError::NotFound(path.to_path_buf()))?;
        let size = meta.len();
        if size > self.config.max_file_size_bytes {
            return Err(DocumentError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.config.max_file_size_bytes,
            });
        }
        Ok(size)
    }

    /// Decode bytes with the encoding ladder
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<(String, TextEncoding), DocumentError> {
        for encoding in TextEncoding::LADDER {
            if let Some(decoded) = encoding.decode(bytes) {
                tracing::debug!(
                    path = %path.display(),
                    encoding = encoding.label(),
                    "Decoded text file"
                );
                return Ok((decoded, encoding));
            }
        }
        Err(DocumentError::Undecodable {
            path: path.to_path_buf(),
            message: "no candidate encoding decoded the file".to_string(),
        })
    }

    /// Normalize line endings and collapse 3+ consecutive blank lines to 2
    fn normalize(&self, text: &str) -> String {
        let unix = text.replace("\r\n", "\n").replace('\r', "\n");
        self.blank_lines.replace_all(&unix, "\n\n").into_owned()
    }

    /// Classify content by keyword and delimiter density
    pub fn classify(text: &str) -> ContentClass {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).take(50).collect();
        if lines.is_empty() {
            return ContentClass::Plain;
        }

        let comma_heavy = lines
            .iter()
            .filter(|l| l.matches(',').count() >= 2)
            .count();
        if comma_heavy * 10 >= lines.len() * 8 {
            return ContentClass::Csv;
        }

        let tabbed = lines.iter().filter(|l| l.contains('\t')).count();
        if tabbed * 10 >= lines.len() * 8 {
            return ContentClass::Tabular;
        }

        let markdownish = lines
            .iter()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with('#') || t.starts_with("```") || t.starts_with("- ") || t.starts_with("* ")
            })
            .count();
        if markdownish * 10 >= lines.len() * 3 {
            return ContentClass::Markdown;
        }

        let lower = text.to_lowercase();
        let keyword_hits = MEDICAL_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .count();
        if keyword_hits >= 3 {
            return ContentClass::MedicalText;
        }

        let loggish = lines
            .iter()
            .filter(|l| {
                l.contains("INFO")
                    || l.contains("ERROR")
                    || l.contains("WARN")
                    || l.contains("DEBUG")
                    || l.starts_with('[')
            })
            .count();
        if loggish * 10 >= lines.len() * 5 {
            return ContentClass::Log;
        }

        ContentClass::Plain
    }
}

#[async_trait]
impl DocumentHandler for TextHandler {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["txt", "text", "csv", "tsv", "md", "log"]
    }

    async fn can_handle(&self, path: &Path, mime_type: Option<&str>) -> bool {
        if let Some(ext) = extension_of(path) {
            if self.extensions().contains(&ext.as_str()) {
                return true;
            }
        }

        if let Some(mime) = mime_type {
            if mime.starts_with("text/") {
                return true;
            }
        }

        // Parse probe: the first kilobyte should contain no NUL bytes.
        match std::fs::File::open(path) {
            Ok(file) => {
                use std::io::Read;
                let mut probe = [0u8; 1024];
                let mut take = file.take(1024);
                match take.read(&mut probe) {
                    Ok(read) => read > 0 && !probe[..read].contains(&0),
                    Err(_) => false,
                }
            }
            Err(_) => false,
        }
    }

    async fn extract_content(&self, path: &Path) -> Result<String, DocumentError> {
        self.check_size(path)?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DocumentError::ExtractionFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let (decoded, _) = self.decode(path, &bytes)?;
        Ok(self.normalize(&decoded))
    }

    async fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata, DocumentError> {
        let size = self.check_size(path)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut metadata = DocumentMetadata::new(file_name, size, "text", "text/plain");
        let (created, modified) = fs_timestamps(path);
        metadata.created_at = created;
        metadata.modified_at = modified;

        if let Ok(bytes) = std::fs::read(path) {
            if let Ok((decoded, encoding)) = self.decode(path, &bytes) {
                metadata.encoding = Some(encoding.label().to_string());
                metadata.custom_properties.insert(
                    "content_class".to_string(),
                    serde_json::Value::String(Self::classify(&decoded).label().to_string()),
                );
            }
        }

        Ok(metadata)
    }
}

impl Default for TextHandler {
    fn default() -> Self {
        Self::new(TextHandlerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_can_handle_by_extension_and_probe() {
        let handler = TextHandler::default();
        let dir = tempdir().unwrap();

        let txt = write_file(&dir, "notes.txt", b"hello");
        assert!(handler.can_handle(&txt, None).await);

        let noext = write_file(&dir, "README", b"plain words");
        assert!(handler.can_handle(&noext, None).await);

        let binary = write_file(&dir, "blob", &[0u8, 159, 146, 150]);
        assert!(!handler.can_handle(&binary, None).await);

        assert!(!handler.can_handle(Path::new("/missing/file"), None).await);
    }

    #[tokio::test]
    async fn test_extract_utf8() {
        let handler = TextHandler::default();
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "note.txt", "Åsa visited".as_bytes());

        let text = handler.extract_content(&path).await.unwrap();
        assert_eq!(text, "Åsa visited");
    }

    #[tokio::test]
    async fn test_extract_latin1_fallback() {
        let handler = TextHandler::default();
        let dir = tempdir().unwrap();
        // 0xE9 is é in Latin-1 and invalid as a UTF-8 start byte here.
        let path = write_file(&dir, "legacy.txt", &[b'c', b'a', b'f', 0xE9]);

        let text = handler.extract_content(&path).await.unwrap();
        assert_eq!(text, "café");
    }

    #[tokio::test]
    async fn test_extract_cp1252_smart_quote() {
        let handler = TextHandler::default();
        let dir = tempdir().unwrap();
        // 0x93/0x94 are curly quotes in cp1252 and C1 controls in Latin-1.
        let path = write_file(&dir, "word.txt", &[0x93, b'h', b'i', 0x94]);

        let text = handler.extract_content(&path).await.unwrap();
        assert_eq!(text, "\u{201C}hi\u{201D}");
    }

    #[tokio::test]
    async fn test_size_cap_enforced_before_decode() {
        let handler = TextHandler::new(TextHandlerConfig {
            max_file_size_bytes: 8,
        });
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "big.txt", b"way past the cap");

        let err = handler.extract_content(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { .. }));
        assert!(err.to_string().contains("too large") || err.to_string().contains("File too large"));
    }

    #[tokio::test]
    async fn test_blank_line_collapse() {
        let handler = TextHandler::default();
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "gaps.txt", b"a\n\n\n\n\nb\r\n\r\nc");

        let text = handler.extract_content(&path).await.unwrap();
        assert_eq!(text, "a\n\nb\n\nc");
    }

    #[test]
    fn test_classify_csv() {
        let text = "id,name,dob\n1,ann,1990\n2,bo,1985\n3,cy,1971";
        assert_eq!(TextHandler::classify(text), ContentClass::Csv);
    }

    #[test]
    fn test_classify_tabular() {
        let text = "id\tname\n1\tann\n2\tbo";
        assert_eq!(TextHandler::classify(text), ContentClass::Tabular);
    }

    #[test]
    fn test_classify_markdown() {
        let text = "# Heading\nSome prose\n## Sub\n- item\n- item";
        assert_eq!(TextHandler::classify(text), ContentClass::Markdown);
    }

    #[test]
    fn test_classify_medical() {
        let text = "Patient presented with symptoms. Diagnosis pending. Medication prescribed.";
        assert_eq!(TextHandler::classify(text), ContentClass::MedicalText);
    }

    #[test]
    fn test_classify_log() {
        let text = "[2024-01-01] INFO started\n[2024-01-01] ERROR failed\n[2024-01-01] INFO done";
        assert_eq!(TextHandler::classify(text), ContentClass::Log);
    }

    #[test]
    fn test_classify_plain() {
        assert_eq!(
            TextHandler::classify("Just an ordinary paragraph of prose."),
            ContentClass::Plain
        );
        assert_eq!(TextHandler::classify(""), ContentClass::Plain);
    }

    #[tokio::test]
    async fn test_metadata_includes_encoding_and_class() {
        let handler = TextHandler::default();
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "plain.txt", b"ordinary text");

        let metadata = handler.extract_metadata(&path).await.unwrap();
        assert_eq!(metadata.file_type, "text");
        assert_eq!(metadata.encoding.as_deref(), Some("utf-8"));
        assert_eq!(
            metadata.custom_properties["content_class"],
            serde_json::Value::String("plain".to_string())
        );
    }
}
