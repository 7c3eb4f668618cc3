//! Document processing data models

use crate::domain::detection::DetectionResult;
use crate::domain::entity::MedicalEntity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata extracted from a document file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Original file name
    pub file_name: String,
    /// File size in bytes
    pub file_size: u64,
    /// File type tag (pdf, docx, image, text)
    pub file_type: String,
    /// MIME type
    pub mime_type: String,
    /// Hex SHA-256 of the raw file bytes (64 chars)
    pub content_hash: String,
    /// Creation timestamp, when the filesystem or format reports one
    pub created_at: Option<DateTime<Utc>>,
    /// Modification timestamp
    pub modified_at: Option<DateTime<Utc>>,
    /// Page count for paginated formats
    pub page_count: Option<u32>,
    /// Detected language, when known
    pub language: Option<String>,
    /// Source text encoding, when known
    pub encoding: Option<String>,
    /// Handler-specific properties (form-field notes, DOCX core properties, ...)
    #[serde(default)]
    pub custom_properties: HashMap<String, serde_json::Value>,
}

impl DocumentMetadata {
    /// Create metadata with the required fields; optional fields start empty.
    pub fn new(
        file_name: impl Into<String>,
        file_size: u64,
        file_type: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            file_type: file_type.into(),
            mime_type: mime_type.into(),
            content_hash: String::new(),
            created_at: None,
            modified_at: None,
            page_count: None,
            language: None,
            encoding: None,
            custom_properties: HashMap::new(),
        }
    }
}

/// Structured summary built from the extracted text
///
/// Everything here is derived, non-authoritative convenience data for
/// downstream consumers. `context` is the one free-form extension point,
/// echoing whatever the caller supplied with the processing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredData {
    /// First 500 characters of the extracted text, ellipsized if truncated
    pub content_preview: String,
    /// Character count of the extracted text
    pub character_count: usize,
    /// Word count of the extracted text
    pub word_count: usize,
    /// Line count of the extracted text
    pub line_count: usize,
    /// Name of the handler that produced the text
    pub handler: String,
    /// When the summary was built
    pub processed_at: DateTime<Utc>,
    /// Caller-supplied context, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    /// Echo of the source file name
    pub file_name: String,
    /// Echo of the source file size in bytes
    pub file_size: u64,
}

/// Maximum preview length in characters.
const PREVIEW_CHARS: usize = 500;

impl StructuredData {
    /// Build a structured summary from extracted text and file facts.
    pub fn from_text(
        text: &str,
        handler: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
        context: Option<serde_json::Value>,
    ) -> Self {
        let char_count = text.chars().count();
        let preview: String = if char_count > PREVIEW_CHARS {
            let mut p: String = text.chars().take(PREVIEW_CHARS).collect();
            p.push_str("...");
            p
        } else {
            text.to_string()
        };

        Self {
            content_preview: preview,
            character_count: char_count,
            word_count: text.split_whitespace().count(),
            line_count: text.lines().count(),
            handler: handler.into(),
            processed_at: Utc::now(),
            context,
            file_name: file_name.into(),
            file_size,
        }
    }
}

/// The central aggregate: one per processed document
///
/// Created at the start of processing and either fully populated on success
/// or returned in a minimal failure state with `processing_errors` set.
/// Processing never propagates raw errors to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProcessingResult {
    /// Whether processing completed
    pub success: bool,
    /// Stable document identifier
    pub document_id: String,
    /// Handler tag that produced this result
    pub content_type: String,
    /// Extracted plain text
    pub extracted_text: String,
    /// Derived structured summary (absent on failure)
    pub structured_data: Option<StructuredData>,
    /// File metadata gathered before any failure point
    pub metadata: Option<DocumentMetadata>,
    /// PHI analysis, when detection was enabled
    pub phi_analysis: Option<DetectionResult>,
    /// Medical entities from the NLP service
    pub medical_entities: Vec<MedicalEntity>,
    /// Redacted text, when redaction was enabled and PHI was found
    pub redacted_content: Option<String>,
    /// Non-fatal warnings accumulated during processing
    pub processing_warnings: Vec<String>,
    /// Errors; non-empty implies `success == false`
    pub processing_errors: Vec<String>,
    /// Overall confidence in the extraction (0.0 - 1.0)
    pub confidence_score: f32,
    /// Wall time spent processing, in milliseconds
    pub processing_time_ms: u64,
}

impl DocumentProcessingResult {
    /// Create an empty in-progress result for a document.
    pub fn started(document_id: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            success: false,
            document_id: document_id.into(),
            content_type: content_type.into(),
            extracted_text: String::new(),
            structured_data: None,
            metadata: None,
            phi_analysis: None,
            medical_entities: Vec::new(),
            redacted_content: None,
            processing_warnings: Vec::new(),
            processing_errors: Vec::new(),
            confidence_score: 0.0,
            processing_time_ms: 0,
        }
    }

    /// Create a minimal failure result with a single error message.
    pub fn failure(
        document_id: impl Into<String>,
        content_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::started(document_id, content_type);
        result.processing_errors.push(error.into());
        result
    }

    /// Number of extracted medical entities.
    pub fn entity_count(&self) -> usize {
        self.medical_entities.len()
    }

    /// Whether PHI was detected in this document.
    pub fn phi_detected(&self) -> bool {
        self.phi_analysis
            .as_ref()
            .map(|analysis| analysis.phi_detected)
            .unwrap_or(false)
    }

    /// Record a non-fatal warning.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.processing_warnings.push(warning.into());
    }

    /// Record an error and mark the result failed.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.processing_errors.push(error.into());
        self.success = false;
    }
}

/// Derive a stable document identifier from the handler tag and content hash.
///
/// Format: `<handler>_<first 8 hash chars>_<epoch seconds>`.
pub fn derive_document_id(handler: &str, content_hash: &str) -> String {
    let prefix: String = content_hash.chars().take(8).collect();
    let epoch = Utc::now().timestamp();
    format!("{handler}_{prefix}_{epoch}")
}
