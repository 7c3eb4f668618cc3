//! Processing coordinator
//!
//! Routes documents to handlers, drives the shared pipeline, persists
//! results and exposes the public operation surface. Every public
//! operation returns a structured response carrying the session id and the
//! fixed compliance disclaimers; no error escapes as a raised error.

use crate::config::HarborConfig;
use crate::core::batch::{run_batch, BatchSummary};
use crate::domain::detection::DetectionResult;
use crate::domain::document::DocumentProcessingResult;
use crate::domain::entity::{ClinicalSummary, MedicalEntity};
use crate::domain::errors::HarborError;
use crate::domain::result::Result;
use crate::handlers::{
    DocumentHandler, DocumentPipeline, DocxHandler, ImageHandler, PdfHandler, PipelineOptions,
    TextHandler,
};
use crate::nlp::EntityExtractionClient;
use crate::phi::PhiDetector;
use crate::store::{
    DocumentStore, DocumentSummary, PostgresClient, SearchFilters, StoreOutcome,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Response to a single-document processing request
#[derive(Debug, Serialize)]
pub struct ProcessingResponse {
    pub success: bool,
    pub session_id: String,
    pub disclaimers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DocumentProcessingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<StoreOutcome>,
}

/// Response to a batch processing request
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub session_id: String,
    pub disclaimers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub summary: BatchSummary,
    pub results: Vec<DocumentProcessingResult>,
}

/// Response to a PHI analysis request
#[derive(Debug, Serialize)]
pub struct PhiSummaryResponse {
    pub success: bool,
    pub session_id: String,
    pub disclaimers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<DetectionResult>,
}

/// Response to an entity extraction request
#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub success: bool,
    pub session_id: String,
    pub disclaimers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub entities: Vec<MedicalEntity>,
    pub summary: ClinicalSummary,
}

/// Response to a document search request
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub session_id: String,
    pub disclaimers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<DocumentSummary>,
}

/// Processing coordinator
///
/// Construct once per session and share; all components are read-only
/// after construction and safe for concurrent batch workers.
pub struct ProcessingCoordinator {
    config: HarborConfig,
    handlers: Vec<Arc<dyn DocumentHandler>>,
    pipeline: DocumentPipeline,
    phi: Arc<PhiDetector>,
    nlp: Arc<EntityExtractionClient>,
    store: Option<Arc<DocumentStore>>,
    session_id: String,
}

impl ProcessingCoordinator {
    /// Create a coordinator from configuration
    ///
    /// Builds the PHI detector (probing the advanced backend once), the
    /// NLP client, the handler registry and, when configured, the document
    /// store with its schema ensured.
    pub async fn new(config: HarborConfig) -> Result<Self> {
        let phi = Arc::new(
            PhiDetector::new(&config.phi)
                .await
                .map_err(|e| HarborError::Detection(e.to_string()))?,
        );
        let nlp = Arc::new(EntityExtractionClient::new(config.nlp.clone()));

        // Registration order is the routing order: specific formats first,
        // the text handler last because its content probe is greedy.
        let handlers: Vec<Arc<dyn DocumentHandler>> = vec![
            Arc::new(PdfHandler::new(config.handlers.pdf.clone())),
            Arc::new(DocxHandler::new()),
            Arc::new(ImageHandler::new(config.handlers.image.clone())),
            Arc::new(TextHandler::new(config.handlers.text.clone())),
        ];

        let store = match config.storage {
            Some(ref storage_config) => {
                let client = Arc::new(PostgresClient::new(storage_config.clone())?);
                client.ensure_schema().await?;
                Some(Arc::new(DocumentStore::new(client)))
            }
            None => None,
        };

        let pipeline = DocumentPipeline::new(phi.clone(), nlp.clone());

        Ok(Self {
            config,
            handlers,
            pipeline,
            phi,
            nlp,
            store,
            session_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Session identifier echoed on every response
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Configured compliance disclaimers
    pub fn disclaimers(&self) -> Vec<String> {
        self.config.compliance.disclaimers.clone()
    }

    /// Whether a document store is attached
    pub fn store_attached(&self) -> bool {
        self.store.is_some()
    }

    /// Default pipeline options derived from the PHI configuration
    pub fn default_options(&self) -> PipelineOptions {
        PipelineOptions {
            detect_phi: self.config.phi.detection_enabled,
            redact: self.config.phi.redaction_enabled,
            ..PipelineOptions::default()
        }
    }

    /// First registered handler that accepts the file
    async fn route(&self, path: &Path) -> Option<Arc<dyn DocumentHandler>> {
        for handler in &self.handlers {
            if handler.can_handle(path, None).await {
                return Some(handler.clone());
            }
        }
        None
    }

    /// Process one path: route, run the pipeline, store on success
    ///
    /// Used by both the single-document operation and batch workers.
    /// Never returns an error; failures are encoded in the result.
    pub(crate) async fn process_path(
        &self,
        path: &Path,
        options: &PipelineOptions,
    ) -> (DocumentProcessingResult, Option<StoreOutcome>) {
        let Some(handler) = self.route(path).await else {
            let format = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(path = %path.display(), format = %format, "No handler for document");
            let result = DocumentProcessingResult::failure(
                options.document_id.clone().unwrap_or_default(),
                "unrouted",
                format!("Unsupported document format: {format}"),
            );
            return (result, None);
        };

        let mut result = self.pipeline.process(handler.as_ref(), path, options).await;

        let outcome = if result.success && !self.config.application.dry_run {
            match self.store {
                Some(ref store) => match store.store(&result).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        tracing::error!(
                            document_id = %result.document_id,
                            error = %e,
                            "Failed to store processing result"
                        );
                        result.add_warning(format!("Storage failed: {e}"));
                        None
                    }
                },
                None => None,
            }
        } else {
            None
        };

        (result, outcome)
    }

    /// Process a single document
    pub async fn process_document(
        &self,
        path: &Path,
        options: &PipelineOptions,
    ) -> ProcessingResponse {
        let (result, stored) = self.process_path(path, options).await;

        ProcessingResponse {
            success: result.success,
            session_id: self.session_id.clone(),
            disclaimers: self.disclaimers(),
            error: result.processing_errors.first().cloned(),
            generated_at: Utc::now(),
            result: Some(result),
            stored,
        }
    }

    /// Process many documents concurrently
    ///
    /// Items are independent: one failure never aborts the rest, and the
    /// summary is reduced from the collected per-item results after all
    /// workers finish.
    pub async fn process_batch(
        &self,
        paths: Vec<PathBuf>,
        options: &PipelineOptions,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> BatchResponse {
        let (summary, results) =
            run_batch(self, paths, options, &self.config.batch, shutdown).await;

        BatchResponse {
            success: summary.failed == 0,
            session_id: self.session_id.clone(),
            disclaimers: self.disclaimers(),
            error: None,
            generated_at: Utc::now(),
            summary,
            results,
        }
    }

    /// Analyze raw content for PHI
    pub async fn analyze_phi(&self, content: &str) -> PhiSummaryResponse {
        match self.phi.detect_with_source(content, "analyze_phi").await {
            Ok(analysis) => PhiSummaryResponse {
                success: true,
                session_id: self.session_id.clone(),
                disclaimers: self.disclaimers(),
                error: None,
                generated_at: Utc::now(),
                analysis: Some(analysis),
            },
            Err(e) => PhiSummaryResponse {
                success: false,
                session_id: self.session_id.clone(),
                disclaimers: self.disclaimers(),
                error: Some(e.to_string()),
                generated_at: Utc::now(),
                analysis: None,
            },
        }
    }

    /// Extract medical entities from raw content
    pub async fn extract_entities(
        &self,
        content: &str,
        entity_types: Option<&[String]>,
    ) -> EntitiesResponse {
        let entities = self.nlp.extract_entities(content, true, entity_types).await;
        let summary = ClinicalSummary::from_entities(&entities);

        EntitiesResponse {
            success: true,
            session_id: self.session_id.clone(),
            disclaimers: self.disclaimers(),
            error: None,
            generated_at: Utc::now(),
            entities,
            summary,
        }
    }

    /// Search stored documents
    pub async fn search_documents(&self, query: &str, filters: &SearchFilters) -> SearchResponse {
        let Some(ref store) = self.store else {
            return SearchResponse {
                success: false,
                session_id: self.session_id.clone(),
                disclaimers: self.disclaimers(),
                error: Some("No document store configured".to_string()),
                generated_at: Utc::now(),
                results: Vec::new(),
            };
        };

        match store.search(query, filters).await {
            Ok(results) => SearchResponse {
                success: true,
                session_id: self.session_id.clone(),
                disclaimers: self.disclaimers(),
                error: None,
                generated_at: Utc::now(),
                results,
            },
            Err(e) => SearchResponse {
                success: false,
                session_id: self.session_id.clone(),
                disclaimers: self.disclaimers(),
                error: Some(e.to_string()),
                generated_at: Utc::now(),
                results: Vec::new(),
            },
        }
    }

    /// Health of the external collaborators, for the stats command
    pub async fn dependency_health(&self) -> (bool, Option<bool>) {
        let nlp_healthy = self.nlp.health_check().await;
        let store_healthy = match self.store {
            Some(ref store) => Some(store.client().test_connection().await.is_ok()),
            None => None,
        };
        (nlp_healthy, store_healthy)
    }

    /// Store statistics, when a store is attached
    pub async fn store_statistics(&self) -> Result<crate::store::StoreStatistics> {
        match self.store {
            Some(ref store) => Ok(store.statistics().await?),
            None => Err(HarborError::Configuration(
                "No document store configured".to_string(),
            )),
        }
    }
}
