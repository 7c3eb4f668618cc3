//! Concurrent batch processing
//!
//! Processes many documents with a bounded worker pool. Items are
//! logically independent: each is wrapped in its own timeout, a failure
//! never aborts the rest, and the summary is computed by reducing the
//! collected results after all workers finish, so the aggregate counts are
//! exact regardless of interleaving.

use crate::config::BatchConfig;
use crate::core::orchestrator::ProcessingCoordinator;
use crate::domain::document::DocumentProcessingResult;
use crate::handlers::PipelineOptions;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// One failed batch item
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Path of the failed document
    pub path: String,
    /// First error message of the failure result
    pub error: String,
}

/// Cumulative statistics over one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Documents submitted
    pub total: usize,
    /// Documents processed successfully
    pub succeeded: usize,
    /// Documents that failed (including timeouts and cancellations)
    pub failed: usize,
    /// Documents in which PHI was detected
    pub phi_documents: usize,
    /// Individual PHI detections across the batch
    pub phi_detections: usize,
    /// Medical entities extracted across the batch
    pub entities_extracted: usize,
    /// Results written to the document store
    pub stored: usize,
    /// Wall time for the whole batch
    pub duration_ms: u64,
    /// Per-item failures
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    fn reduce(
        items: &[(PathBuf, DocumentProcessingResult, bool)],
        duration: Duration,
    ) -> Self {
        let mut summary = Self {
            total: items.len(),
            succeeded: 0,
            failed: 0,
            phi_documents: 0,
            phi_detections: 0,
            entities_extracted: 0,
            stored: 0,
            duration_ms: duration.as_millis() as u64,
            failures: Vec::new(),
        };

        for (path, result, stored) in items {
            if result.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                summary.failures.push(BatchFailure {
                    path: path.display().to_string(),
                    error: result
                        .processing_errors
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }

            if let Some(ref analysis) = result.phi_analysis {
                if analysis.phi_detected {
                    summary.phi_documents += 1;
                }
                summary.phi_detections += analysis.detections.len();
            }
            summary.entities_extracted += result.medical_entities.len();
            if *stored {
                summary.stored += 1;
            }
        }

        summary
    }
}

/// Run a batch over the coordinator
///
/// Concurrency is bounded by `config.max_concurrency`; each item gets
/// `config.item_timeout_seconds` before it is failed individually. When a
/// shutdown signal fires, items not yet started are failed as cancelled
/// while in-flight items run to completion.
pub(crate) async fn run_batch(
    coordinator: &ProcessingCoordinator,
    paths: Vec<PathBuf>,
    options: &PipelineOptions,
    config: &BatchConfig,
    shutdown: Option<watch::Receiver<bool>>,
) -> (BatchSummary, Vec<DocumentProcessingResult>) {
    let started = Instant::now();
    let item_timeout = Duration::from_secs(config.item_timeout_seconds);

    tracing::info!(
        documents = paths.len(),
        max_concurrency = config.max_concurrency,
        item_timeout_seconds = config.item_timeout_seconds,
        "Starting batch"
    );

    let items: Vec<(PathBuf, DocumentProcessingResult, bool)> = stream::iter(paths)
        .map(|path| {
            let shutdown = shutdown.clone();
            async move {
                if shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
                    let result = DocumentProcessingResult::failure(
                        String::new(),
                        "unrouted",
                        format!("Cancelled by shutdown: {}", path.display()),
                    );
                    return (path, result, false);
                }

                match tokio::time::timeout(
                    item_timeout,
                    coordinator.process_path(&path, options),
                )
                .await
                {
                    Ok((result, outcome)) => (path, result, outcome.is_some()),
                    Err(_) => {
                        tracing::error!(
                            path = %path.display(),
                            timeout_seconds = item_timeout.as_secs(),
                            "Document processing timed out"
                        );
                        let result = DocumentProcessingResult::failure(
                            String::new(),
                            "unrouted",
                            format!(
                                "Processing timed out after {}s: {}",
                                item_timeout.as_secs(),
                                path.display()
                            ),
                        );
                        (path, result, false)
                    }
                }
            }
        })
        .buffer_unordered(config.max_concurrency)
        .collect()
        .await;

    let summary = BatchSummary::reduce(&items, started.elapsed());
    tracing::info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        phi_documents = summary.phi_documents,
        duration_ms = summary.duration_ms,
        "Batch finished"
    );

    let results = items.into_iter().map(|(_, result, _)| result).collect();
    (summary, results)
}
