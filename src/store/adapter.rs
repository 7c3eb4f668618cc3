//! Document store operations
//!
//! Persists processing results with full-text search and the per-detection
//! PHI detail table. Storing the same document_id twice updates in place;
//! oversized extracted text is truncated with a marker, never silently
//! dropped and never rejected.

use crate::domain::document::DocumentProcessingResult;
use crate::domain::errors::StorageError;
use crate::store::client::PostgresClient;
use crate::store::models::{
    DocumentSummary, SearchFilters, StoreOutcome, StoreStatistics, StoredDocument,
};
use crate::store::SEARCH_LIMIT_MAX;
use std::sync::Arc;

/// Marker appended to truncated extracted text.
const TRUNCATION_MARKER: &str = "\n[TRUNCATED]";

/// Document store over PostgreSQL
pub struct DocumentStore {
    client: Arc<PostgresClient>,
}

impl DocumentStore {
    /// Create a store over an existing client
    pub fn new(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }

    /// Access the underlying client
    pub fn client(&self) -> &Arc<PostgresClient> {
        &self.client
    }

    /// Store a processing result (upsert by document_id)
    pub async fn store(
        &self,
        result: &DocumentProcessingResult,
    ) -> Result<StoreOutcome, StorageError> {
        let cap = self.client.config().max_stored_text_bytes;
        let (text, truncated) = truncate_text(&result.extracted_text, cap);
        if truncated {
            tracing::warn!(
                document_id = %result.document_id,
                cap_bytes = cap,
                "Extracted text truncated before storage"
            );
        }

        let (file_name, file_type, mime_type, file_size, content_hash) = match result.metadata {
            Some(ref m) => (
                m.file_name.clone(),
                m.file_type.clone(),
                m.mime_type.clone(),
                m.file_size as i64,
                m.content_hash.clone(),
            ),
            None => (
                "unknown".to_string(),
                result.content_type.clone(),
                "application/octet-stream".to_string(),
                0,
                String::new(),
            ),
        };

        let phi_detected = result.phi_detected();
        let phi_types: Vec<String> = result
            .phi_analysis
            .as_ref()
            .map(|analysis| {
                analysis
                    .phi_types
                    .iter()
                    .map(|k| k.label().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let phi_types_json = serde_json::to_value(&phi_types)
            .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;
        let entities_json = serde_json::to_value(&result.medical_entities)
            .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;
        let structured_json = serde_json::to_value(&result.structured_data)
            .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;

        let upsert = r#"
            INSERT INTO documents (
                document_id, content_type, file_name, file_type, mime_type,
                file_size, content_hash, extracted_text, structured_data,
                phi_detected, phi_types, medical_entities, entity_count,
                confidence_score, processing_time_ms, content_truncated, stored_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW())
            ON CONFLICT (document_id) DO UPDATE SET
                content_type = EXCLUDED.content_type,
                file_name = EXCLUDED.file_name,
                file_type = EXCLUDED.file_type,
                mime_type = EXCLUDED.mime_type,
                file_size = EXCLUDED.file_size,
                content_hash = EXCLUDED.content_hash,
                extracted_text = EXCLUDED.extracted_text,
                structured_data = EXCLUDED.structured_data,
                phi_detected = EXCLUDED.phi_detected,
                phi_types = EXCLUDED.phi_types,
                medical_entities = EXCLUDED.medical_entities,
                entity_count = EXCLUDED.entity_count,
                confidence_score = EXCLUDED.confidence_score,
                processing_time_ms = EXCLUDED.processing_time_ms,
                content_truncated = EXCLUDED.content_truncated,
                stored_at = NOW()
            RETURNING id
        "#;

        let row = self
            .client
            .query_opt(
                upsert,
                &[
                    &result.document_id,
                    &result.content_type,
                    &file_name,
                    &file_type,
                    &mime_type,
                    &file_size,
                    &content_hash,
                    &text,
                    &structured_json,
                    &phi_detected,
                    &phi_types_json,
                    &entities_json,
                    &(result.entity_count() as i32),
                    &result.confidence_score,
                    &(result.processing_time_ms as i64),
                    &truncated,
                ],
            )
            .await?
            .ok_or_else(|| StorageError::WriteFailed("upsert returned no row".to_string()))?;

        let internal_id: i64 = row.get(0);
        self.replace_phi_details(internal_id, result).await?;

        tracing::info!(
            document_id = %result.document_id,
            truncated = truncated,
            "Document stored"
        );

        Ok(StoreOutcome {
            stored: true,
            document_id: result.document_id.clone(),
            truncated,
        })
    }

    /// Rewrite the PHI detail rows for a document
    async fn replace_phi_details(
        &self,
        internal_id: i64,
        result: &DocumentProcessingResult,
    ) -> Result<(), StorageError> {
        self.client
            .execute(
                "DELETE FROM document_phi_details WHERE document_ref = $1",
                &[&internal_id],
            )
            .await?;

        let Some(ref analysis) = result.phi_analysis else {
            return Ok(());
        };

        let insert = r#"
            INSERT INTO document_phi_details (
                document_ref, phi_type, detected_text,
                start_position, end_position, confidence_score, detection_method
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;

        for detection in &analysis.detections {
            self.client
                .execute(
                    insert,
                    &[
                        &internal_id,
                        &detection.kind.label(),
                        &detection.matched_text,
                        &(detection.start as i32),
                        &(detection.end as i32),
                        &detection.confidence,
                        &detection.method.label(),
                    ],
                )
                .await?;
        }

        Ok(())
    }

    /// Retrieve a stored document by its document_id
    pub async fn retrieve(
        &self,
        document_id: &str,
    ) -> Result<Option<StoredDocument>, StorageError> {
        let query = r#"
            SELECT document_id, content_type, file_name, file_type, mime_type,
                   file_size, content_hash, extracted_text, structured_data,
                   phi_detected, phi_types, medical_entities, entity_count,
                   confidence_score, processing_time_ms, content_truncated,
                   created_at, stored_at
            FROM documents
            WHERE document_id = $1
        "#;

        let row = self.client.query_opt(query, &[&document_id]).await?;
        row.map(row_to_document).transpose()
    }

    /// Ranked full-text search with filters
    ///
    /// An empty query returns the newest documents matching the filters.
    /// The result cap is the caller's limit clamped to the configured
    /// default and the hard maximum of [`SEARCH_LIMIT_MAX`].
    pub async fn search(
        &self,
        query_text: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<DocumentSummary>, StorageError> {
        let limit = effective_limit(filters.limit, self.client.config().search_limit) as i64;
        let query_text = query_text.trim();

        let sql = r#"
            SELECT document_id, file_name, content_type, phi_detected,
                   entity_count, created_at,
                   CASE WHEN $1 <> ''
                        THEN ts_rank(to_tsvector('english', extracted_text),
                                     plainto_tsquery('english', $1))
                        ELSE 0.0::real
                   END AS rank
            FROM documents
            WHERE ($1 = '' OR to_tsvector('english', extracted_text)
                               @@ plainto_tsquery('english', $1))
              AND ($2::text IS NULL OR content_type = $2)
              AND ($3::boolean IS NULL OR phi_detected = $3)
              AND ($4::text IS NULL OR file_type = $4)
              AND ($5::timestamptz IS NULL OR created_at >= $5)
              AND ($6::timestamptz IS NULL OR created_at < $6)
            ORDER BY rank DESC, created_at DESC
            LIMIT $7
        "#;

        let rows = self
            .client
            .query(
                sql,
                &[
                    &query_text,
                    &filters.content_type,
                    &filters.phi_detected,
                    &filters.file_type,
                    &filters.created_after,
                    &filters.created_before,
                    &limit,
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| DocumentSummary {
                document_id: row.get("document_id"),
                file_name: row.get("file_name"),
                content_type: row.get("content_type"),
                phi_detected: row.get("phi_detected"),
                entity_count: row.get("entity_count"),
                created_at: row.get("created_at"),
                rank: row.get("rank"),
            })
            .collect())
    }

    /// Aggregate counters over the store
    pub async fn statistics(&self) -> Result<StoreStatistics, StorageError> {
        let totals = self
            .client
            .query(
                r#"
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE phi_detected) AS phi_docs,
                       COALESCE(SUM(entity_count), 0)::bigint AS entities,
                       COALESCE(AVG(confidence_score), 0)::float8 AS avg_confidence
                FROM documents
                "#,
                &[],
            )
            .await?;
        let totals = totals
            .first()
            .ok_or_else(|| StorageError::QueryFailed("empty aggregate result".to_string()))?;

        let detail_count: i64 = self
            .client
            .query("SELECT COUNT(*) FROM document_phi_details", &[])
            .await?
            .first()
            .map(|row| row.get(0))
            .unwrap_or(0);

        let by_type = self
            .client
            .query(
                r#"
                SELECT content_type, COUNT(*)::bigint
                FROM documents
                GROUP BY content_type
                ORDER BY content_type
                "#,
                &[],
            )
            .await?;

        Ok(StoreStatistics {
            total_documents: totals.get("total"),
            phi_documents: totals.get("phi_docs"),
            total_entities: totals.get("entities"),
            total_phi_details: detail_count,
            average_confidence: totals.get("avg_confidence"),
            by_content_type: by_type
                .into_iter()
                .map(|row| (row.get(0), row.get(1)))
                .collect(),
        })
    }
}

/// Convert a documents row into a [`StoredDocument`]
fn row_to_document(row: tokio_postgres::Row) -> Result<StoredDocument, StorageError> {
    let phi_types_json: serde_json::Value = row.get("phi_types");
    let phi_types: Vec<String> = serde_json::from_value(phi_types_json)
        .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;

    Ok(StoredDocument {
        document_id: row.get("document_id"),
        content_type: row.get("content_type"),
        file_name: row.get("file_name"),
        file_type: row.get("file_type"),
        mime_type: row.get("mime_type"),
        file_size: row.get("file_size"),
        content_hash: row.get("content_hash"),
        extracted_text: row.get("extracted_text"),
        structured_data: row.get("structured_data"),
        phi_detected: row.get("phi_detected"),
        phi_types,
        medical_entities: row.get("medical_entities"),
        entity_count: row.get("entity_count"),
        confidence_score: row.get("confidence_score"),
        processing_time_ms: row.get("processing_time_ms"),
        content_truncated: row.get("content_truncated"),
        created_at: row.get("created_at"),
        stored_at: row.get("stored_at"),
    })
}

/// Truncate text at a byte cap on a char boundary, appending the marker
fn truncate_text(text: &str, cap_bytes: usize) -> (String, bool) {
    if text.len() <= cap_bytes {
        return (text.to_string(), false);
    }

    let mut cut = cap_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut truncated = text[..cut].to_string();
    truncated.push_str(TRUNCATION_MARKER);
    (truncated, true)
}

/// Clamp a requested limit to the configured default and the hard maximum
fn effective_limit(requested: Option<usize>, configured_default: usize) -> usize {
    requested
        .unwrap_or(configured_default)
        .clamp(1, SEARCH_LIMIT_MAX)
}
