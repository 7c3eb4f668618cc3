//! Document store data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a store operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOutcome {
    /// Whether the document was written
    pub stored: bool,
    /// Document id written (echoed from the result)
    pub document_id: String,
    /// Whether the extracted text was truncated at the size cap
    pub truncated: bool,
}

/// One stored document, as retrieved from the documents table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document_id: String,
    pub content_type: String,
    pub file_name: String,
    pub file_type: String,
    pub mime_type: String,
    pub file_size: i64,
    pub content_hash: String,
    pub extracted_text: String,
    pub structured_data: serde_json::Value,
    pub phi_detected: bool,
    pub phi_types: Vec<String>,
    pub medical_entities: serde_json::Value,
    pub entity_count: i32,
    pub confidence_score: f32,
    pub processing_time_ms: i64,
    pub content_truncated: bool,
    pub created_at: DateTime<Utc>,
    pub stored_at: DateTime<Utc>,
}

/// One ranked search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub file_name: String,
    pub content_type: String,
    pub phi_detected: bool,
    pub entity_count: i32,
    pub created_at: DateTime<Utc>,
    /// Full-text relevance rank; 0 when no query text was given
    pub rank: f32,
}

/// Search filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Restrict to one handler's documents
    pub content_type: Option<String>,
    /// Restrict by PHI presence
    pub phi_detected: Option<bool>,
    /// Restrict by source file type
    pub file_type: Option<String>,
    /// Only documents created at or after this instant
    pub created_after: Option<DateTime<Utc>>,
    /// Only documents created before this instant
    pub created_before: Option<DateTime<Utc>>,
    /// Result cap; clamped to the hard maximum
    pub limit: Option<usize>,
}

/// Aggregate counters over the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_documents: i64,
    pub phi_documents: i64,
    pub total_entities: i64,
    pub total_phi_details: i64,
    pub average_confidence: f64,
    /// Document counts per content type
    pub by_content_type: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_filters_default_is_open() {
        let filters = SearchFilters::default();
        assert!(filters.content_type.is_none());
        assert!(filters.phi_detected.is_none());
        assert!(filters.limit.is_none());
    }

    #[test]
    fn test_store_outcome_serializes() {
        let outcome = StoreOutcome {
            stored: true,
            document_id: "text_ab12cd34_1700000000".to_string(),
            truncated: false,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["stored"], true);
        assert_eq!(json["truncated"], false);
    }
}
