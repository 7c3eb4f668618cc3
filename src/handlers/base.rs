//! Shared document processing pipeline
//!
//! Implements the workflow every handler shares: verify the file, hash it,
//! extract text and metadata, detect and redact PHI, extract medical
//! entities and build the structured summary. Extraction failures are
//! caught here and converted into failure results; nothing in this module
//! propagates an error to its caller.

use crate::domain::detection::RedactionLevel;
use crate::domain::document::{
    derive_document_id, DocumentProcessingResult, StructuredData,
};
use crate::domain::errors::DocumentError;
use crate::handlers::DocumentHandler;
use crate::nlp::EntityExtractionClient;
use crate::phi::PhiDetector;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;

/// Per-request processing options
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Caller-supplied document id; derived from the content hash if absent
    pub document_id: Option<String>,
    /// Free-form caller context echoed into the structured summary
    pub context: Option<serde_json::Value>,
    /// Run PHI detection over the extracted text
    pub detect_phi: bool,
    /// Redact detected PHI (requires detect_phi)
    pub redact: bool,
    /// Redaction level override; the detector's configured level otherwise
    pub redaction_level: Option<RedactionLevel>,
}

impl PipelineOptions {
    /// Detection and redaction on, everything else defaulted
    pub fn standard() -> Self {
        Self {
            detect_phi: true,
            redact: true,
            ..Self::default()
        }
    }
}

/// Chunk size for hashing file contents.
const HASH_CHUNK_BYTES: usize = 64 * 1024;

/// Shared pipeline driving a handler through the full workflow
pub struct DocumentPipeline {
    phi: Arc<PhiDetector>,
    nlp: Arc<EntityExtractionClient>,
}

impl DocumentPipeline {
    /// Create a pipeline over the given detector and NLP client
    pub fn new(phi: Arc<PhiDetector>, nlp: Arc<EntityExtractionClient>) -> Self {
        Self { phi, nlp }
    }

    /// Process one document with the given handler
    ///
    /// Always returns a result: on any failure past the routing step the
    /// result carries `success = false`, the error message, and whatever
    /// partial metadata was gathered before the failure point.
    pub async fn process(
        &self,
        handler: &dyn DocumentHandler,
        path: &Path,
        options: &PipelineOptions,
    ) -> DocumentProcessingResult {
        let started = Instant::now();

        if !path.exists() {
            let err = DocumentError::NotFound(path.to_path_buf());
            let mut result = DocumentProcessingResult::failure(
                options.document_id.clone().unwrap_or_default(),
                handler.name(),
                err.to_string(),
            );
            result.processing_time_ms = started.elapsed().as_millis() as u64;
            return result;
        }

        if !handler.can_handle(path, None).await {
            let err = DocumentError::UnsupportedFormat(format!(
                "{} handler cannot process {}",
                handler.name(),
                path.display()
            ));
            let mut result = DocumentProcessingResult::failure(
                options.document_id.clone().unwrap_or_default(),
                handler.name(),
                err.to_string(),
            );
            result.processing_time_ms = started.elapsed().as_millis() as u64;
            return result;
        }

        let content_hash = match hash_file(path).await {
            Ok(hash) => hash,
            Err(e) => {
                let mut result = DocumentProcessingResult::failure(
                    options.document_id.clone().unwrap_or_default(),
                    handler.name(),
                    format!("Failed to hash {}: {e}", path.display()),
                );
                result.processing_time_ms = started.elapsed().as_millis() as u64;
                return result;
            }
        };

        let document_id = options
            .document_id
            .clone()
            .unwrap_or_else(|| derive_document_id(handler.name(), &content_hash));

        let mut result = DocumentProcessingResult::started(&document_id, handler.name());

        match self
            .run_stages(handler, path, options, &content_hash, &mut result)
            .await
        {
            Ok(()) => {
                result.success = true;
                tracing::info!(
                    document_id = %result.document_id,
                    handler = handler.name(),
                    phi_detected = result.phi_detected(),
                    entities = result.entity_count(),
                    "Document processed"
                );
            }
            Err(e) => {
                tracing::error!(
                    document_id = %result.document_id,
                    handler = handler.name(),
                    error = %e,
                    "Document processing failed"
                );
                result.add_error(e.to_string());
            }
        }

        result.processing_time_ms = started.elapsed().as_millis() as u64;
        result
    }

    /// Extraction through structured-data stages
    ///
    /// Mutates `result` as stages complete so a failure mid-way leaves the
    /// partial data gathered so far in place.
    async fn run_stages(
        &self,
        handler: &dyn DocumentHandler,
        path: &Path,
        options: &PipelineOptions,
        content_hash: &str,
        result: &mut DocumentProcessingResult,
    ) -> Result<(), DocumentError> {
        let text = handler.extract_content(path).await?;
        result.extracted_text = text;

        let mut metadata = handler.extract_metadata(path).await?;
        metadata.content_hash = content_hash.to_string();
        let file_name = metadata.file_name.clone();
        let file_size = metadata.file_size;
        result.metadata = Some(metadata);

        if options.detect_phi {
            match self
                .phi
                .detect_with_source(&result.extracted_text, &result.document_id)
                .await
            {
                Ok(analysis) => {
                    if options.redact && analysis.phi_detected {
                        let redacted = match options.redaction_level {
                            Some(level) => {
                                self.phi.redact_at(&result.extracted_text, &analysis, level)
                            }
                            None => self.phi.redact(&result.extracted_text, &analysis),
                        };
                        result.redacted_content = Some(redacted);
                    }
                    result.phi_analysis = Some(analysis);
                }
                Err(e) => {
                    // Detection trouble is not an extraction failure; keep
                    // the document but flag it for review.
                    tracing::warn!(error = %e, "PHI detection failed");
                    result.add_warning(format!("PHI detection failed: {e}"));
                }
            }
        }

        match self.nlp.try_extract(&result.extracted_text, true, None).await {
            Ok(entities) => result.medical_entities = entities,
            Err(e) => {
                tracing::warn!(error = %e, "Entity extraction degraded to empty");
                result.add_warning(format!("Entity extraction unavailable: {e}"));
            }
        }

        result.structured_data = Some(StructuredData::from_text(
            &result.extracted_text,
            handler.name(),
            file_name,
            file_size,
            options.context.clone(),
        ));

        result.confidence_score = if result.extracted_text.trim().is_empty() {
            0.0
        } else {
            handler.extraction_confidence()
        };

        Ok(())
    }
}

/// SHA-256 over the full byte stream, in chunks
async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_BYTES];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
